//! # mboxd
//!
//! mboxd is a local SMTP server that appends accepted mail to per-user mbox
//! files.
//!
//! ## Quick Start
//!
//! ```no_run
//! use mboxd::SmtpServer;
//! use std::thread;
//!
//! // Deliver to /var/mail/<user>.mbox; mailbox files must already exist
//! let server = SmtpServer::new("localhost", "/var/mail");
//!
//! thread::spawn(move || {
//!     server.start("127.0.0.1:2500").unwrap();
//! });
//! ```
//!
//! ## Supported SMTP commands
//!
//! - `HELO` - Identify the client
//! - `MAIL FROM` - Specify the sender's address
//! - `RCPT TO` - Specify a local recipient (repeatable)
//! - `DATA` - Send the message, terminated by `<CRLF>.<CRLF>`
//! - `RSET` - Abandon the current transaction
//! - `NOOP` - Do nothing (only before `HELO`)
//! - `QUIT` - Close connection
//!
//! ## Delivery
//!
//! A recipient `user@<hostname>` is accepted only when `<mail_dir>/user.mbox`
//! exists. Each delivered message is appended as
//!
//! ```text
//! From <sender> Tue Mar 05 09:07:02 2024
//! <message body>
//! ```
//!
//! Sessions run on their own threads. Appends to one mailbox are serialized
//! in-process and under an exclusive `flock`, so records never interleave.
//!
//! ## Notes
//!
//! - After `DATA` completes, a new transaction needs `RSET` and `HELO`.
//! - [`SmtpServer::shutdown`] sends `421` to every open session, disconnects
//!   it and stops the accept loop. The binary calls it on Ctrl-C.
//! - No SMTP extensions, relaying, or delivery retries.

pub mod logging;
pub mod mailbox;
mod smtp;

pub use mailbox::{LockRegistry, MailStore, Mailbox};
pub use smtp::{
    Command, DeliveryError, LineFramer, Message, Outcome, Phase, SessionRegistry,
    SmtpCommandHandler, SmtpError, SmtpResponse, SmtpServer, SmtpSession, Verb,
};
