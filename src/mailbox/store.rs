//! Appending messages to mbox files in the mail directory

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::PoisonError;

use tracing::{debug, trace};

use crate::mailbox::registry::LockRegistry;
use crate::smtp::command::local_part;
use crate::smtp::error::DeliveryError;
use crate::smtp::message::Message;

/// Suffix of every mailbox file
pub const MAILBOX_EXTENSION: &str = "mbox";

/// A local user's mailbox file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    pub local_part: String,
    pub path: PathBuf,
}

impl Mailbox {
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

/// The mail directory and the locks guarding its mailboxes.
///
/// One store is shared by all sessions of a server. Mailbox files are never
/// created here; a user exists exactly when `<local-part>.mbox` does.
#[derive(Debug)]
pub struct MailStore {
    mail_dir: PathBuf,
    locks: LockRegistry,
}

impl MailStore {
    pub fn new(mail_dir: impl Into<PathBuf>) -> Self {
        Self {
            mail_dir: mail_dir.into(),
            locks: LockRegistry::new(),
        }
    }

    pub fn mail_dir(&self) -> &Path {
        &self.mail_dir
    }

    /// Map an address to its mailbox by local-part.
    ///
    /// Returns `None` when the local-part could not name a file inside the
    /// mail directory. Whether the file exists is not checked.
    pub fn resolve(&self, address: &str) -> Option<Mailbox> {
        let local = local_part(address);
        if local.is_empty() || local.starts_with('.') || local.contains(['/', '\\', '\0']) {
            return None;
        }

        Some(Mailbox {
            local_part: local.to_string(),
            path: self.mail_dir.join(format!("{local}.{MAILBOX_EXTENSION}")),
        })
    }

    /// Whether the address has an existing mailbox
    pub fn has_mailbox(&self, address: &str) -> bool {
        self.resolve(address).is_some_and(|mailbox| mailbox.exists())
    }

    /// Append one mbox record for `message` to the recipient's mailbox.
    ///
    /// Appends to the same mailbox are serialized through the lock registry,
    /// and an exclusive advisory lock is held on the written handle so other
    /// processes that honour `flock` see whole records only.
    pub fn deliver(&self, recipient: &str, message: &Message) -> Result<(), DeliveryError> {
        let mailbox = self
            .resolve(recipient)
            .ok_or_else(|| DeliveryError::UnknownMailbox(recipient.to_string()))?;

        let lock = self.locks.get_or_create(&mailbox.path);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        trace!(path = %mailbox.path.display(), "acquired mailbox lock");

        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(&mailbox.path)
            .map_err(|source| DeliveryError::Open {
                path: mailbox.path.clone(),
                source,
            })?;

        let mut locked = LockedFile::acquire(file).map_err(|source| DeliveryError::Lock {
            path: mailbox.path.clone(),
            source,
        })?;

        let record = message.to_mbox_record();
        locked
            .write_all(&record)
            .and_then(|()| locked.flush())
            .map_err(|source| DeliveryError::Write {
                path: mailbox.path.clone(),
                source,
            })?;

        debug!(
            mailbox = %mailbox.local_part,
            bytes = record.len(),
            "appended message"
        );
        Ok(())
    }
}

/// An open mailbox holding an exclusive OS lock until dropped
struct LockedFile {
    file: File,
}

impl LockedFile {
    fn acquire(file: File) -> std::io::Result<Self> {
        file.lock()?;
        Ok(Self { file })
    }
}

impl Write for LockedFile {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()
    }
}

impl Drop for LockedFile {
    fn drop(&mut self) {
        // Closing the handle drops the lock anyway
        let _ = self.file.unlock();
    }
}
