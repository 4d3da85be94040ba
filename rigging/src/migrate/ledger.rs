//! Version ledger: the durable record of applied migrations
//!
//! The ledger is append-only from the engine's point of view: apply appends
//! the newest id, revert removes ids newest first. Mutations require the
//! advisory lock, which callers take for the whole apply or revert run.

use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;

/// Interval between lock attempts
pub const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// One applied migration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Migration id
    pub id: String,
    /// When the apply transaction committed
    pub applied_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Entry stamped with the current time
    #[must_use]
    pub fn now(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            applied_at: Utc::now(),
        }
    }
}

/// Persistence for applied migration ids
///
/// Entries are returned in application order; the last one is the current
/// version.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VersionLedger: Send + Sync {
    /// Take the exclusive lock, waiting at most `timeout`
    ///
    /// # Errors
    ///
    /// [`Error::LedgerLocked`] if another holder keeps the lock past the timeout.
    async fn lock(&self, timeout: Duration) -> Result<()>;

    /// Release the lock; releasing an unheld lock is a no-op
    async fn unlock(&self) -> Result<()>;

    /// Applied entries in application order
    async fn list(&self) -> Result<Vec<LedgerEntry>>;

    /// Record `id` as the newest applied migration
    async fn append(&self, id: &str) -> Result<()>;

    /// Forget `id`
    async fn remove(&self, id: &str) -> Result<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    applied: Vec<LedgerEntry>,
}

fn append_entry(entries: &mut Vec<LedgerEntry>, id: &str) -> Result<()> {
    if entries.iter().any(|e| e.id == id) {
        return Err(Error::Ledger(format!("migration {id} is already recorded")));
    }
    entries.push(LedgerEntry::now(id));
    Ok(())
}

fn remove_entry(entries: &mut Vec<LedgerEntry>, id: &str) -> Result<()> {
    let Some(index) = entries.iter().position(|e| e.id == id) else {
        return Err(Error::Ledger(format!("migration {id} is not recorded")));
    };
    entries.remove(index);
    Ok(())
}

/// JSON ledger file guarded by a sibling `.lock` file
///
/// The lock file is created with `create_new`, so at most one process holds
/// it. It records the holder's pid and is removed on unlock or drop. A lock
/// left behind by a process that no longer exists is taken over; a holder
/// whose liveness cannot be established is waited on until the timeout.
#[derive(Debug)]
pub struct FileLedger {
    path: PathBuf,
    lock_path: PathBuf,
    held: Mutex<bool>,
}

impl FileLedger {
    /// Ledger stored at `path` (e.g. `.rigging/ledger.json`)
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let lock_path = path.with_extension("lock");
        Self {
            path,
            lock_path,
            held: Mutex::new(false),
        }
    }

    /// Ledger file path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lock file path
    #[must_use]
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    fn ensure_held(&self) -> Result<()> {
        if *self.held.lock() {
            Ok(())
        } else {
            Err(Error::Ledger("ledger must be locked before it is modified".into()))
        }
    }

    async fn read(&self) -> Result<LedgerFile> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(source) => serde_json::from_str(&source).map_err(|e| {
                Error::Ledger(format!("{} is corrupt: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(LedgerFile::default()),
            Err(e) => Err(Error::io(&self.path, e)),
        }
    }

    async fn write(&self, file: &LedgerFile) -> Result<()> {
        let json = serde_json::to_string_pretty(file)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| Error::io(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| Error::io(&self.path, e))
    }

    async fn try_create_lock(&self) -> io::Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.lock_path)
            .await?;
        let holder = format!("pid {} since {}\n", std::process::id(), Utc::now().to_rfc3339());
        file.write_all(holder.as_bytes()).await?;
        file.flush().await
    }

    /// Remove the lock file if its recorded holder has exited
    ///
    /// Returns whether a stale lock was removed. The file is re-read right
    /// before removal so a lock taken over by someone else in between is
    /// left alone.
    async fn clear_stale_lock(&self) -> io::Result<bool> {
        let holder = match tokio::fs::read_to_string(&self.lock_path).await {
            Ok(holder) => holder,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(true),
            Err(e) => return Err(e),
        };
        let Some(pid) = holder_pid(&holder) else {
            return Ok(false);
        };
        if pid == std::process::id() || process_is_alive(pid) {
            return Ok(false);
        }
        let current = tokio::fs::read_to_string(&self.lock_path).await.ok();
        if current.as_deref() != Some(holder.as_str()) {
            return Ok(false);
        }
        tracing::warn!(
            lock = %self.lock_path.display(),
            pid,
            "Removing ledger lock left by an exited process"
        );
        match tokio::fs::remove_file(&self.lock_path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(true),
            Err(e) => Err(e),
        }
    }
}

/// Pid recorded in a lock file written by [`FileLedger`]
fn holder_pid(holder: &str) -> Option<u32> {
    holder.strip_prefix("pid ")?.split_whitespace().next()?.parse().ok()
}

#[cfg(target_os = "linux")]
fn process_is_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

#[cfg(not(target_os = "linux"))]
fn process_is_alive(_pid: u32) -> bool {
    true
}

#[async_trait]
impl VersionLedger for FileLedger {
    async fn lock(&self, timeout: Duration) -> Result<()> {
        if let Some(parent) = self.lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io(parent, e))?;
        }

        let deadline = Instant::now() + timeout;
        loop {
            match self.try_create_lock().await {
                Ok(()) => {
                    *self.held.lock() = true;
                    tracing::debug!(lock = %self.lock_path.display(), "Acquired ledger lock");
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    if self
                        .clear_stale_lock()
                        .await
                        .map_err(|e| Error::io(&self.lock_path, e))?
                    {
                        continue;
                    }
                    if Instant::now() >= deadline {
                        let holder = tokio::fs::read_to_string(&self.lock_path)
                            .await
                            .unwrap_or_default();
                        return Err(Error::LedgerLocked(format!(
                            "{} is held ({})",
                            self.lock_path.display(),
                            holder.trim()
                        )));
                    }
                    tokio::time::sleep(LOCK_POLL_INTERVAL).await;
                }
                Err(e) => return Err(Error::io(&self.lock_path, e)),
            }
        }
    }

    async fn unlock(&self) -> Result<()> {
        if !std::mem::replace(&mut *self.held.lock(), false) {
            return Ok(());
        }
        match tokio::fs::remove_file(&self.lock_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::io(&self.lock_path, e)),
        }
    }

    async fn list(&self) -> Result<Vec<LedgerEntry>> {
        Ok(self.read().await?.applied)
    }

    async fn append(&self, id: &str) -> Result<()> {
        self.ensure_held()?;
        let mut file = self.read().await?;
        append_entry(&mut file.applied, id)?;
        self.write(&file).await
    }

    async fn remove(&self, id: &str) -> Result<()> {
        self.ensure_held()?;
        let mut file = self.read().await?;
        remove_entry(&mut file.applied, id)?;
        self.write(&file).await
    }
}

impl Drop for FileLedger {
    fn drop(&mut self) {
        if *self.held.get_mut() {
            let _ = std::fs::remove_file(&self.lock_path);
        }
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    entries: Vec<LedgerEntry>,
    locked: bool,
    held_elsewhere: bool,
}

/// In-memory ledger for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: Mutex<MemoryState>,
}

impl MemoryLedger {
    /// Empty ledger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger pre-populated with `ids`, in order
    #[must_use]
    pub fn with_applied<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries = ids.into_iter().map(LedgerEntry::now).collect();
        Self {
            state: Mutex::new(MemoryState {
                entries,
                ..MemoryState::default()
            }),
        }
    }

    /// Simulate another process holding the lock
    pub fn hold_externally(&self, held: bool) {
        self.state.lock().held_elsewhere = held;
    }

    /// Whether this ledger's own lock is held
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.state.lock().locked
    }

    /// Applied ids in order
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.state.lock().entries.iter().map(|e| e.id.clone()).collect()
    }

    fn try_lock(&self) -> bool {
        let mut state = self.state.lock();
        if state.locked || state.held_elsewhere {
            false
        } else {
            state.locked = true;
            true
        }
    }

    fn ensure_held(state: &MemoryState) -> Result<()> {
        if state.locked {
            Ok(())
        } else {
            Err(Error::Ledger("ledger must be locked before it is modified".into()))
        }
    }
}

#[async_trait]
impl VersionLedger for MemoryLedger {
    async fn lock(&self, timeout: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.try_lock() {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(Error::LedgerLocked("in-memory ledger is held".into()));
            }
            tokio::time::sleep(LOCK_POLL_INTERVAL).await;
        }
    }

    async fn unlock(&self) -> Result<()> {
        self.state.lock().locked = false;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<LedgerEntry>> {
        Ok(self.state.lock().entries.clone())
    }

    async fn append(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock();
        Self::ensure_held(&state)?;
        append_entry(&mut state.entries, id)
    }

    async fn remove(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock();
        Self::ensure_held(&state)?;
        remove_entry(&mut state.entries, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_ledger_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FileLedger::new(dir.path().join(".rigging").join("ledger.json"));

        assert!(ledger.list().await.unwrap().is_empty());
        ledger.lock(Duration::from_millis(100)).await.unwrap();
        assert!(ledger.lock_path().exists());
        ledger.append("20250101000000").await.unwrap();
        ledger.append("20250102000000").await.unwrap();
        ledger.unlock().await.unwrap();
        assert!(!ledger.lock_path().exists());

        let reopened = FileLedger::new(ledger.path());
        let ids: Vec<_> = reopened
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, ["20250101000000", "20250102000000"]);
    }

    #[tokio::test]
    async fn test_file_ledger_requires_lock() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FileLedger::new(dir.path().join("ledger.json"));
        assert!(matches!(
            ledger.append("20250101000000").await,
            Err(Error::Ledger(_))
        ));
    }

    #[tokio::test]
    async fn test_file_ledger_contention() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let first = FileLedger::new(&path);
        let second = FileLedger::new(&path);

        first.lock(Duration::from_millis(100)).await.unwrap();
        let err = second.lock(Duration::from_millis(120)).await.unwrap_err();
        assert!(matches!(err, Error::LedgerLocked(_)));
        assert!(err.to_string().contains("pid"));

        first.unlock().await.unwrap();
        second.lock(Duration::from_millis(100)).await.unwrap();
        second.unlock().await.unwrap();
    }

    #[tokio::test]
    async fn test_dropping_holder_releases_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        {
            let holder = FileLedger::new(&path);
            holder.lock(Duration::from_millis(100)).await.unwrap();
        }
        let next = FileLedger::new(&path);
        next.lock(Duration::from_millis(100)).await.unwrap();
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_lock_left_by_exited_process_is_taken_over() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FileLedger::new(dir.path().join("ledger.json"));
        // Above the kernel's pid_max, so no such process can exist
        std::fs::write(
            ledger.lock_path(),
            "pid 4194305 since 2025-01-01T00:00:00+00:00\n",
        )
        .unwrap();

        ledger.lock(Duration::from_millis(100)).await.unwrap();
        let holder = std::fs::read_to_string(ledger.lock_path()).unwrap();
        assert_eq!(holder_pid(&holder), Some(std::process::id()));
        ledger.unlock().await.unwrap();
    }

    #[tokio::test]
    async fn test_unreadable_holder_is_waited_on() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FileLedger::new(dir.path().join("ledger.json"));
        std::fs::write(ledger.lock_path(), "held by a deploy script\n").unwrap();

        let err = ledger.lock(Duration::from_millis(120)).await.unwrap_err();
        assert!(matches!(err, Error::LedgerLocked(_)));
        assert!(ledger.lock_path().exists());
    }

    #[test]
    fn test_holder_pid() {
        assert_eq!(holder_pid("pid 42 since 2025-01-01T00:00:00+00:00\n"), Some(42));
        assert_eq!(holder_pid("pid x"), None);
        assert_eq!(holder_pid(""), None);
    }

    #[tokio::test]
    async fn test_corrupt_ledger_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        std::fs::write(&path, "not json").unwrap();
        let ledger = FileLedger::new(&path);
        assert!(matches!(ledger.list().await, Err(Error::Ledger(_))));
    }

    #[tokio::test]
    async fn test_duplicate_and_missing_ids() {
        let ledger = MemoryLedger::with_applied(["20250101000000"]);
        ledger.lock(Duration::ZERO).await.unwrap();
        assert!(ledger.append("20250101000000").await.is_err());
        assert!(ledger.remove("20990101000000").await.is_err());
        ledger.remove("20250101000000").await.unwrap();
        assert!(ledger.ids().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_memory_ledger_times_out_when_held() {
        let ledger = MemoryLedger::new();
        ledger.hold_externally(true);
        let err = ledger.lock(Duration::from_secs(2)).await.unwrap_err();
        assert!(matches!(err, Error::LedgerLocked(_)));
        assert!(!ledger.is_locked());
    }
}
