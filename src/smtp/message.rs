//! A finished mail transaction, ready for delivery

use chrono::{DateTime, Local};

/// `asctime(3)` layout used on mbox envelope lines
const ENVELOPE_TIME_FORMAT: &str = "%a %b %d %H:%M:%S %Y";

/// Represents a message accepted by the DATA command
#[derive(Debug, Clone)]
pub struct Message {
    /// The envelope sender from MAIL FROM
    pub sender: String,

    /// Recipients in the order they were accepted
    pub recipients: Vec<String>,

    /// The raw message content, always ending in a newline unless empty
    pub body: Vec<u8>,

    /// When the message was received by the server
    pub received_at: DateTime<Local>,
}

impl Message {
    pub fn new(sender: String, recipients: Vec<String>, body: Vec<u8>) -> Self {
        Self {
            sender,
            recipients,
            body,
            received_at: Local::now(),
        }
    }

    /// The `From <sender> <timestamp>` line that opens an mbox record
    pub fn envelope_line(&self) -> String {
        format!(
            "From <{}> {}\n",
            self.sender,
            self.received_at.format(ENVELOPE_TIME_FORMAT)
        )
    }

    /// Envelope line followed by the body, as appended to a mailbox
    pub fn to_mbox_record(&self) -> Vec<u8> {
        let mut record = self.envelope_line().into_bytes();
        record.extend_from_slice(&self.body);
        record
    }
}
