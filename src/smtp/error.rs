//! Error types for the SMTP server

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while interpreting a session's commands.
///
/// Everything except [`SmtpError::Io`] is a protocol error: it is answered
/// with a reply and the connection stays open.
#[derive(Error, Debug)]
pub enum SmtpError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid command")]
    InvalidCommand,

    #[error("Invalid state for command")]
    InvalidState,

    #[error("Invalid syntax: {0}")]
    InvalidSyntax(String),

    #[error("No such user")]
    NoSuchUser,

    #[error("Mailbox unavailable")]
    MailboxUnavailable,
}

impl SmtpError {
    pub fn to_response_code(&self) -> u16 {
        match self {
            SmtpError::Io(_) => 421,
            SmtpError::InvalidCommand | SmtpError::InvalidSyntax(_) => 501,
            SmtpError::InvalidState => 503,
            SmtpError::NoSuchUser | SmtpError::MailboxUnavailable => 550,
        }
    }

    pub fn to_response_message(&self) -> String {
        match self {
            SmtpError::Io(_) => "Service not available".to_string(),
            SmtpError::InvalidCommand => "Syntax error, command unrecognized".to_string(),
            SmtpError::InvalidState => "Bad sequence of commands".to_string(),
            SmtpError::InvalidSyntax(msg) => format!("Syntax error: {msg}"),
            SmtpError::NoSuchUser => "No such user".to_string(),
            SmtpError::MailboxUnavailable => {
                "Requested action not taken: mailbox unavailable".to_string()
            }
        }
    }

    /// Whether the session can continue after replying to this error
    pub fn is_protocol_error(&self) -> bool {
        !matches!(self, SmtpError::Io(_))
    }
}

/// Failure appending a message to one recipient's mailbox
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("cannot open mailbox {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot lock mailbox {}: {source}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot append to mailbox {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("address {0} does not name a local mailbox")]
    UnknownMailbox(String),
}
