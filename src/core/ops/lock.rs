//! core::ops::lock
//!
//! Exclusive per-branch lock for mutations.
//!
//! # Architecture
//!
//! Git ref advancement is not atomic under concurrent writers, so every
//! mutation holds this lock across "read tip, build tree, commit, advance
//! ref". The lock is keyed by (repository, branch): writers on different
//! branches never contend.
//!
//! The lock is an OS-level exclusive file lock (`fs2`). Every acquisition
//! opens its own file handle, so it excludes other threads of the same
//! process as well as other processes.
//!
//! # Storage
//!
//! - `<git_dir>/branchfs/locks/<key>.lock`, see [`ProviderPaths`]
//!
//! # Invariants
//!
//! - Lock is released on drop (RAII pattern)
//! - Waiting is bounded; an expired wait is [`LockError::TimedOut`]
//! - A waiter can be aborted before it gets the lock
//!
//! # Example
//!
//! ```ignore
//! use branchfs::core::ops::lock::BranchLock;
//! use std::time::Duration;
//!
//! let lock = BranchLock::acquire(&paths, &branch, Duration::from_secs(5), || false)?;
//! // ... read tip, commit, advance ref ...
//! drop(lock);
//! ```

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;
use thiserror::Error;
use tracing::trace;

use crate::core::paths::ProviderPaths;
use crate::core::types::BranchName;

/// First sleep between polls; doubled up to [`MAX_POLL_INTERVAL`].
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);
const MAX_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another writer holds the lock (non-blocking acquire only).
    #[error("branch is locked by another writer")]
    AlreadyLocked,

    /// The lock was not obtained within the bound.
    #[error("timed out after {waited:?} waiting for branch lock")]
    TimedOut {
        /// How long the caller waited.
        waited: Duration,
    },

    /// The caller gave up before the lock was obtained.
    #[error("lock wait aborted")]
    Aborted,

    /// Failed to create lock file or directory.
    #[error("failed to create lock: {0}")]
    CreateFailed(String),

    /// Failed to acquire the OS lock.
    #[error("failed to acquire lock: {0}")]
    AcquireFailed(String),

    /// Failed to release the lock.
    #[error("failed to release lock: {0}")]
    ReleaseFailed(String),
}

/// An exclusive lock on one branch of one repository.
#[derive(Debug)]
pub struct BranchLock {
    path: PathBuf,
    /// When this is Some, we hold the lock.
    file: Option<File>,
}

impl BranchLock {
    /// Try once to take the lock without waiting.
    ///
    /// # Errors
    ///
    /// - [`LockError::AlreadyLocked`] if another writer holds it
    /// - [`LockError::CreateFailed`] if the lock file cannot be created
    pub fn try_acquire(paths: &ProviderPaths, branch: &BranchName) -> Result<Self, LockError> {
        let file = Self::open_lock_file(paths, branch)?;
        let path = paths.branch_lock_path(branch);

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                path,
                file: Some(file),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Err(LockError::AlreadyLocked),
            Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
                Err(LockError::AlreadyLocked)
            }
            Err(e) => Err(LockError::AcquireFailed(e.to_string())),
        }
    }

    /// Take the lock, waiting at most `timeout`.
    ///
    /// `should_abort` is polled between attempts; when it returns true the
    /// wait ends with [`LockError::Aborted`].
    pub fn acquire(
        paths: &ProviderPaths,
        branch: &BranchName,
        timeout: Duration,
        should_abort: impl Fn() -> bool,
    ) -> Result<Self, LockError> {
        let started = Instant::now();
        let mut interval = MIN_POLL_INTERVAL;

        loop {
            if should_abort() {
                return Err(LockError::Aborted);
            }
            match Self::try_acquire(paths, branch) {
                Ok(lock) => {
                    trace!(branch = %branch, waited = ?started.elapsed(), "branch lock acquired");
                    return Ok(lock);
                }
                Err(LockError::AlreadyLocked) => {}
                Err(e) => return Err(e),
            }

            let waited = started.elapsed();
            if waited >= timeout {
                return Err(LockError::TimedOut { waited });
            }
            std::thread::sleep(interval.min(timeout - waited));
            interval = (interval * 2).min(MAX_POLL_INTERVAL);
        }
    }

    fn open_lock_file(paths: &ProviderPaths, branch: &BranchName) -> Result<File, LockError> {
        let dir = paths.locks_dir();
        fs::create_dir_all(&dir).map_err(|e| {
            LockError::CreateFailed(format!("cannot create {}: {}", dir.display(), e))
        })?;

        let path = paths.branch_lock_path(branch);
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| LockError::CreateFailed(format!("cannot open {}: {}", path.display(), e)))
    }

    /// Check if the lock is currently held.
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// Get the path to the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock before the guard goes out of scope.
    pub fn release(&mut self) -> Result<(), LockError> {
        if let Some(file) = self.file.take() {
            file.unlock()
                .map_err(|e| LockError::ReleaseFailed(e.to_string()))?;
        }
        Ok(())
    }
}

impl Drop for BranchLock {
    fn drop(&mut self) {
        // Closing the handle releases the lock too; unlock is best-effort.
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
    }
}
