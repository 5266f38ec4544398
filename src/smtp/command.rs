//! Command line parsing

use crate::smtp::error::SmtpError;

/// SMTP verbs understood by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verb {
    Helo,
    Mail,
    Rcpt,
    Data,
    Rset,
    Noop,
    Quit,
    /// Anything else, upper-cased as received
    Unknown(String),
}

impl Verb {
    fn from_upper(verb: &str) -> Self {
        match verb {
            "HELO" => Verb::Helo,
            "MAIL" => Verb::Mail,
            "RCPT" => Verb::Rcpt,
            "DATA" => Verb::Data,
            "RSET" => Verb::Rset,
            "NOOP" => Verb::Noop,
            "QUIT" => Verb::Quit,
            other => Verb::Unknown(other.to_string()),
        }
    }
}

/// A command line split into its verb and the remaining argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub verb: Verb,
    /// Everything after the first space, as sent
    pub argument: String,
}

impl Command {
    /// Split a line at its first space and normalize the verb's case.
    ///
    /// Surrounding whitespace is trimmed from the whole line first, so
    /// `"  quit \r"` parses as `QUIT` with an empty argument.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (verb, argument) = match line.split_once(' ') {
            Some((verb, argument)) => (verb, argument),
            None => (line, ""),
        };

        Self {
            verb: Verb::from_upper(&verb.to_ascii_uppercase()),
            argument: argument.to_string(),
        }
    }

    pub fn has_argument(&self) -> bool {
        !self.argument.trim().is_empty()
    }
}

/// Parse a `KEYWORD:<address>` path argument as used by MAIL and RCPT.
///
/// The keyword is matched case-insensitively; spaces and tabs are allowed
/// around the colon and around the bracketed address. Returns the text
/// between the angle brackets.
pub fn parse_path(argument: &str, keyword: &str) -> Result<String, SmtpError> {
    let Some((head, tail)) = argument.split_once(':') else {
        return Err(SmtpError::InvalidSyntax("missing :".to_string()));
    };

    let head = head.trim_matches(BLANK);
    if !head.eq_ignore_ascii_case(keyword) {
        return Err(SmtpError::InvalidSyntax(format!("expected {keyword}")));
    }

    let path = tail.trim_matches(BLANK);
    let address = path
        .strip_prefix('<')
        .and_then(|rest| rest.strip_suffix('>'))
        .ok_or_else(|| {
            SmtpError::InvalidSyntax("address must be enclosed in angle brackets".to_string())
        })?;

    Ok(address.to_string())
}

/// Basic address check shared by MAIL and RCPT
pub fn validate_address(address: &str) -> Result<(), SmtpError> {
    if address.contains('@') {
        Ok(())
    } else {
        Err(SmtpError::InvalidSyntax("invalid email".to_string()))
    }
}

/// The part of an address before its first `@`
pub fn local_part(address: &str) -> &str {
    address.split_once('@').map_or(address, |(local, _)| local)
}

const BLANK: &[char] = &[' ', '\t'];
