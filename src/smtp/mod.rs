//! SMTP server implementation

pub mod command;
pub mod commands;
pub mod error;
pub mod framer;
pub mod message;
pub mod response;
pub mod server;
pub mod session;
pub mod sessions;

pub use command::{Command, Verb};
pub use commands::{Outcome, SmtpCommandHandler};
pub use error::{DeliveryError, SmtpError};
pub use framer::LineFramer;
pub use message::Message;
pub use response::SmtpResponse;
pub use server::SmtpServer;
pub use session::{Phase, SmtpSession};
pub use sessions::SessionRegistry;
