//! SMTP response handling

use crate::smtp::error::SmtpError;

/// A single-line reply sent to the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpResponse {
    /// The SMTP reply code (e.g. 250, 354, 503)
    pub code: u16,
    /// The human-readable text
    pub message: String,
}

impl SmtpResponse {
    /// Create a new SMTP response
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Create a success response (250 OK)
    pub fn ok() -> Self {
        Self::new(250, "OK")
    }

    /// Create a greeting response (220)
    pub fn greeting(hostname: &str) -> Self {
        Self::new(220, format!("{hostname} Service ready"))
    }

    /// Create a HELO response (250)
    pub fn helo(hostname: &str) -> Self {
        Self::new(250, hostname)
    }

    /// Create a DATA intermediate response (354)
    pub fn data_start() -> Self {
        Self::new(354, "Start mail input; end with <CRLF>.<CRLF>")
    }

    /// Create a QUIT response (221)
    pub fn quit(hostname: &str) -> Self {
        Self::new(221, format!("{hostname} closing transmission"))
    }

    /// Notice sent to every open session when the server stops (421)
    pub fn shutting_down(hostname: &str) -> Self {
        Self::new(
            421,
            format!("{hostname} Service not available, server shutting down"),
        )
    }

    /// Format the response for sending over the wire
    pub fn format(&self) -> String {
        format!("{} {}\r\n", self.code, self.message)
    }
}

impl From<&SmtpError> for SmtpResponse {
    fn from(err: &SmtpError) -> Self {
        Self::new(err.to_response_code(), err.to_response_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_response() {
        let response = SmtpResponse::ok();
        assert_eq!(response.code, 250);
        assert_eq!(response.message, "OK");
        assert_eq!(response.format(), "250 OK\r\n");
    }

    #[test]
    fn test_helo_response() {
        assert_eq!(SmtpResponse::helo("localhost").format(), "250 localhost\r\n");
    }

    #[test]
    fn test_quit_response() {
        assert_eq!(
            SmtpResponse::quit("localhost").format(),
            "221 localhost closing transmission\r\n"
        );
    }

    #[test]
    fn test_data_start_response() {
        let response = SmtpResponse::data_start();
        assert_eq!(response.code, 354);
        assert!(response.format().starts_with("354 "));
    }

    #[test]
    fn test_shutdown_notice() {
        assert_eq!(
            SmtpResponse::shutting_down("mx.local").format(),
            "421 mx.local Service not available, server shutting down\r\n"
        );
    }

    #[test]
    fn test_from_error() {
        let response = SmtpResponse::from(&SmtpError::NoSuchUser);
        assert_eq!(response.format(), "550 No such user\r\n");
    }
}
