//! Per-mailbox mutual exclusion shared by every session

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Maps a mailbox path to the mutex that serializes appends to it.
///
/// Entries are created on first use and live as long as the registry. The
/// map itself sits behind its own mutex, so concurrent first lookups of the
/// same mailbox always receive the same entry.
#[derive(Debug, Default)]
pub struct LockRegistry {
    entries: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the mutex guarding `mailbox`, creating it if needed
    pub fn get_or_create(&self, mailbox: &Path) -> Arc<Mutex<()>> {
        // Appends never leave the map inconsistent, so a poisoned lock is safe to reuse
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(entries.entry(mailbox.to_path_buf()).or_default())
    }

    /// Number of mailboxes seen so far
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
