//! Mailbox storage

pub mod registry;
pub mod store;

pub use registry::LockRegistry;
pub use store::{MAILBOX_EXTENSION, MailStore, Mailbox};
