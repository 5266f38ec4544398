//! SMTP session state management

use crate::smtp::message::Message;

/// Where a session stands in the mail transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Connected, or reset - waiting for HELO
    Init,
    /// HELO received - ready for MAIL
    Greeted,
    /// MAIL FROM accepted - ready for RCPT
    SenderSet,
    /// At least one RCPT TO accepted - ready for DATA or more RCPT
    RecipientSet,
    /// Message body received and handed to delivery
    Completed,
}

/// Transaction state for a single connection.
///
/// Owned by the thread serving the connection; nothing here is shared.
#[derive(Debug)]
pub struct SmtpSession {
    phase: Phase,
    sender: String,
    recipients: Vec<String>,
    body: Vec<u8>,
}

impl SmtpSession {
    pub fn new() -> Self {
        Self {
            phase: Phase::Init,
            sender: String::new(),
            recipients: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Clear sender, recipients and body and return to `Init`
    pub fn reset(&mut self) {
        self.phase = Phase::Init;
        self.sender.clear();
        self.recipients.clear();
        self.body.clear();
    }

    pub fn greet(&mut self) {
        self.phase = Phase::Greeted;
    }

    /// Start a new transaction from `sender`
    pub fn set_sender(&mut self, sender: String) {
        debug_assert!(!sender.is_empty());
        self.sender = sender;
        self.recipients.clear();
        self.body.clear();
        self.phase = Phase::SenderSet;
    }

    /// Append a recipient; duplicates are kept
    pub fn add_recipient(&mut self, recipient: String) {
        debug_assert!(matches!(self.phase, Phase::SenderSet | Phase::RecipientSet));
        self.recipients.push(recipient);
        self.phase = Phase::RecipientSet;
    }

    /// Store the received body and finish the transaction
    pub fn complete(&mut self, body: Vec<u8>) -> Message {
        debug_assert_eq!(self.phase, Phase::RecipientSet);
        self.body = body;
        self.phase = Phase::Completed;
        Message::new(
            self.sender.clone(),
            self.recipients.clone(),
            self.body.clone(),
        )
    }
}

impl Default for SmtpSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_recipient() -> SmtpSession {
        let mut session = SmtpSession::new();
        session.greet();
        session.set_sender("sender@example.com".to_string());
        session.add_recipient("u@localhost".to_string());
        session
    }

    #[test]
    fn test_new_session() {
        let session = SmtpSession::new();
        assert_eq!(session.phase(), Phase::Init);
        assert!(session.sender().is_empty());
        assert!(session.recipients().is_empty());
        assert!(session.body().is_empty());
    }

    #[test]
    fn test_set_sender() {
        let mut session = SmtpSession::new();
        session.greet();
        session.set_sender("sender@example.com".to_string());
        assert_eq!(session.sender(), "sender@example.com");
        assert_eq!(session.phase(), Phase::SenderSet);
    }

    #[test]
    fn test_duplicate_recipients_kept_in_order() {
        let mut session = with_recipient();
        session.add_recipient("v@localhost".to_string());
        session.add_recipient("u@localhost".to_string());
        assert_eq!(
            session.recipients(),
            ["u@localhost", "v@localhost", "u@localhost"]
        );
        assert_eq!(session.phase(), Phase::RecipientSet);
    }

    #[test]
    fn test_complete() {
        let mut session = with_recipient();
        let message = session.complete(b"hello\r\n".to_vec());

        assert_eq!(session.phase(), Phase::Completed);
        assert_eq!(session.body(), b"hello\r\n");
        assert_eq!(message.sender, "sender@example.com");
        assert_eq!(message.recipients, vec!["u@localhost"]);
        assert_eq!(message.body, b"hello\r\n");
    }

    #[test]
    fn test_reset() {
        let mut session = with_recipient();
        session.complete(b"x\r\n".to_vec());

        session.reset();

        assert_eq!(session.phase(), Phase::Init);
        assert!(session.sender().is_empty());
        assert!(session.recipients().is_empty());
        assert!(session.body().is_empty());
    }
}
