//! Implementation of SMTP commands

use tracing::warn;

use crate::mailbox::MailStore;
use crate::smtp::command::{Command, Verb, local_part, parse_path, validate_address};
use crate::smtp::error::SmtpError;
use crate::smtp::response::SmtpResponse;
use crate::smtp::session::{Phase, SmtpSession};

/// What the connection should do after a command has been handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Send the reply and read the next command
    Reply(SmtpResponse),
    /// Send the reply, then capture a message body
    ReadBody(SmtpResponse),
    /// Send the reply, then close the connection
    Close(SmtpResponse),
}

impl Outcome {
    pub fn response(&self) -> &SmtpResponse {
        match self {
            Outcome::Reply(response) | Outcome::ReadBody(response) | Outcome::Close(response) => {
                response
            }
        }
    }
}

/// Applies commands to a session and decides the replies
#[derive(Debug)]
pub struct SmtpCommandHandler<'a> {
    hostname: &'a str,
    store: &'a MailStore,
}

impl<'a> SmtpCommandHandler<'a> {
    /// `hostname` is both the name used in replies and the only domain
    /// accepted for recipients.
    pub fn new(hostname: &'a str, store: &'a MailStore) -> Self {
        Self { hostname, store }
    }

    /// Process a command line.
    ///
    /// A rejected command leaves the session untouched.
    pub fn process_command(
        &self,
        command_line: &str,
        session: &mut SmtpSession,
    ) -> Result<Outcome, SmtpError> {
        let command = Command::parse(command_line);

        match command.verb {
            Verb::Helo => self.handle_helo(&command, session).map(Outcome::Reply),
            Verb::Mail => self.handle_mail(&command, session).map(Outcome::Reply),
            Verb::Rcpt => self.handle_rcpt(&command, session).map(Outcome::Reply),
            Verb::Data => self.handle_data(&command, session).map(Outcome::ReadBody),
            Verb::Rset => self.handle_rset(&command, session).map(Outcome::Reply),
            Verb::Noop => self.handle_noop(&command, session).map(Outcome::Reply),
            Verb::Quit => self.handle_quit(&command, session).map(Outcome::Close),
            Verb::Unknown(_) => Err(SmtpError::InvalidCommand),
        }
    }

    /// Finish a DATA command with the captured body and deliver it.
    ///
    /// The first response is always `250 OK`. Each recipient whose mailbox
    /// cannot be written adds a `550`; the others are still delivered.
    pub fn finish_data(&self, body: Vec<u8>, session: &mut SmtpSession) -> Vec<SmtpResponse> {
        let message = session.complete(body);
        let mut responses = vec![SmtpResponse::ok()];

        for recipient in &message.recipients {
            if let Err(e) = self.store.deliver(recipient, &message) {
                warn!(%recipient, error = %e, "delivery failed");
                responses.push(SmtpResponse::from(&SmtpError::MailboxUnavailable));
            }
        }

        responses
    }

    fn handle_helo(
        &self,
        command: &Command,
        session: &mut SmtpSession,
    ) -> Result<SmtpResponse, SmtpError> {
        if !command.has_argument() {
            return Err(SmtpError::InvalidSyntax("missing domain".to_string()));
        }

        match session.phase() {
            Phase::Init | Phase::Greeted => {
                session.greet();
                Ok(SmtpResponse::helo(self.hostname))
            }
            _ => Err(SmtpError::InvalidState),
        }
    }

    fn handle_mail(
        &self,
        command: &Command,
        session: &mut SmtpSession,
    ) -> Result<SmtpResponse, SmtpError> {
        if session.phase() != Phase::Greeted {
            return Err(SmtpError::InvalidState);
        }

        let sender = parse_path(&command.argument, "FROM")?;
        validate_address(&sender)?;

        session.set_sender(sender);
        Ok(SmtpResponse::ok())
    }

    fn handle_rcpt(
        &self,
        command: &Command,
        session: &mut SmtpSession,
    ) -> Result<SmtpResponse, SmtpError> {
        if !matches!(session.phase(), Phase::SenderSet | Phase::RecipientSet) {
            return Err(SmtpError::InvalidState);
        }

        let recipient = parse_path(&command.argument, "TO")?;
        if !self.is_local(&recipient) {
            return Err(SmtpError::NoSuchUser);
        }
        validate_address(&recipient)?;
        if local_part(&recipient).is_empty() {
            return Err(SmtpError::InvalidSyntax("invalid email".to_string()));
        }

        if !self.store.has_mailbox(&recipient) {
            return Err(SmtpError::MailboxUnavailable);
        }

        session.add_recipient(recipient);
        Ok(SmtpResponse::ok())
    }

    fn handle_data(
        &self,
        command: &Command,
        session: &mut SmtpSession,
    ) -> Result<SmtpResponse, SmtpError> {
        reject_argument(command)?;
        if session.phase() != Phase::RecipientSet {
            return Err(SmtpError::InvalidState);
        }

        Ok(SmtpResponse::data_start())
    }

    fn handle_rset(
        &self,
        command: &Command,
        session: &mut SmtpSession,
    ) -> Result<SmtpResponse, SmtpError> {
        reject_argument(command)?;
        if session.phase() == Phase::Init {
            return Err(SmtpError::InvalidState);
        }

        session.reset();
        Ok(SmtpResponse::ok())
    }

    /// NOOP is only accepted before HELO
    fn handle_noop(
        &self,
        command: &Command,
        session: &mut SmtpSession,
    ) -> Result<SmtpResponse, SmtpError> {
        reject_argument(command)?;
        if session.phase() != Phase::Init {
            return Err(SmtpError::InvalidState);
        }

        Ok(SmtpResponse::ok())
    }

    fn handle_quit(
        &self,
        command: &Command,
        session: &mut SmtpSession,
    ) -> Result<SmtpResponse, SmtpError> {
        reject_argument(command)?;
        session.reset();
        Ok(SmtpResponse::quit(self.hostname))
    }

    fn is_local(&self, address: &str) -> bool {
        address
            .rsplit_once('@')
            .is_some_and(|(_, domain)| domain.eq_ignore_ascii_case(self.hostname))
    }
}

fn reject_argument(command: &Command) -> Result<(), SmtpError> {
    if command.has_argument() {
        Err(SmtpError::InvalidSyntax("remove argument".to_string()))
    } else {
        Ok(())
    }
}
