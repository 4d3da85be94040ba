//! Undo log for a generation batch

use super::fs::FileSystem;
use std::io;
use std::path::PathBuf;

/// One reversible change
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum UndoEntry {
    /// A file that did not exist before
    Created(PathBuf),
    /// A file overwritten; carries its previous contents
    Modified { path: PathBuf, prior: String },
    /// A directory that did not exist before
    CreatedDir(PathBuf),
}

/// Changes made so far, oldest first
#[derive(Debug, Default)]
pub(super) struct UndoLog {
    entries: Vec<UndoEntry>,
}

impl UndoLog {
    pub(super) fn record(&mut self, entry: UndoEntry) {
        self.entries.push(entry);
    }

    pub(super) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Undo every change, newest first
    ///
    /// Entries that are already gone are skipped. Replay continues past a
    /// failing entry and reports the first failure.
    pub(super) fn replay<F: FileSystem>(self, fs: &mut F) -> io::Result<()> {
        let mut first_error = None;
        for entry in self.entries.into_iter().rev() {
            let result = match &entry {
                UndoEntry::Created(path) => fs.remove_file(path),
                UndoEntry::Modified { path, prior } => fs.write(path, prior),
                UndoEntry::CreatedDir(path) => fs.remove_dir(path),
            };
            match result {
                Err(e) if e.kind() != io::ErrorKind::NotFound => {
                    tracing::warn!(entry = ?entry, error = %e, "Undo step failed");
                    first_error.get_or_insert(e);
                }
                _ => {}
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
