//! error
//!
//! Public error taxonomy of the filesystem provider.
//!
//! Every layer keeps its own error enum (`GitError`, `LockError`,
//! `AddressError`, ...). Operations reachable by callers of the provider
//! convert into [`FsError`], whose variants name what went wrong in
//! filesystem terms. [`FsError::kind`] gives a flat, serializable tag for
//! UI layers that only need to pick a message.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::core::naming::NameError;
use crate::core::ops::LockError;
use crate::core::resolver::AddressError;
use crate::core::types::{BranchName, RepoName};
use crate::git::GitError;

/// Errors surfaced by the filesystem provider.
#[derive(Debug, Error)]
pub enum FsError {
    /// The address could not be parsed.
    #[error(transparent)]
    MalformedAddress(#[from] AddressError),

    /// Nothing exists at the path.
    #[error("not found: {path}")]
    NotFound { path: String },

    /// A file operation was applied to a directory.
    #[error("is a directory: {path}")]
    IsDirectory { path: String },

    /// A directory operation was applied to a file, or a path runs
    /// through a file.
    #[error("not a directory: {path}")]
    NotADirectory { path: String },

    /// The target name is already taken in its directory.
    #[error("already exists: {path}")]
    DuplicateName { path: String },

    /// The requested entry name cannot be stored.
    #[error(transparent)]
    InvalidName(#[from] NameError),

    /// A metadata key or value cannot be stored as a commit trailer.
    #[error("invalid metadata '{key}': {reason}")]
    InvalidMetadata { key: String, reason: &'static str },

    /// The path belongs to a different repository or branch.
    #[error("path {path} is not on {expected}")]
    ForeignPath { path: String, expected: String },

    /// The branch moved away from the commit the change was based on.
    #[error("concurrent modification of {branch}: expected {expected}, found {actual}")]
    ConcurrentModification {
        branch: String,
        expected: String,
        actual: String,
    },

    /// The branch lock could not be obtained in time.
    #[error("branch {branch} is busy (waited {waited:?})")]
    Busy { branch: String, waited: Duration },

    /// The caller cancelled before the change was published.
    #[error("operation cancelled")]
    Cancelled,

    /// The repository is closed or storage failed.
    #[error("repository {repo} unavailable: {message}")]
    RepositoryUnavailable { repo: String, message: String },

    /// No repository with that name is mounted.
    #[error("repository not found: {repo}")]
    RepositoryNotFound { repo: String },

    /// A repository with that name already exists.
    #[error("repository already exists: {repo}")]
    RepositoryExists { repo: String },

    /// The branch ref does not exist.
    #[error("branch {branch} not found in {repo}")]
    BranchNotFound { repo: String, branch: String },

    /// The branch ref already exists.
    #[error("branch {branch} already exists in {repo}")]
    BranchExists { repo: String, branch: String },
}

/// Flat tag for an [`FsError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MalformedAddress,
    NotFound,
    IsDirectory,
    NotADirectory,
    DuplicateName,
    InvalidName,
    InvalidMetadata,
    ForeignPath,
    ConcurrentModification,
    Busy,
    Cancelled,
    RepositoryUnavailable,
    RepositoryNotFound,
    RepositoryExists,
    BranchNotFound,
    BranchExists,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::MalformedAddress => "malformed_address",
            ErrorKind::NotFound => "not_found",
            ErrorKind::IsDirectory => "is_directory",
            ErrorKind::NotADirectory => "not_a_directory",
            ErrorKind::DuplicateName => "duplicate_name",
            ErrorKind::InvalidName => "invalid_name",
            ErrorKind::InvalidMetadata => "invalid_metadata",
            ErrorKind::ForeignPath => "foreign_path",
            ErrorKind::ConcurrentModification => "concurrent_modification",
            ErrorKind::Busy => "busy",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::RepositoryUnavailable => "repository_unavailable",
            ErrorKind::RepositoryNotFound => "repository_not_found",
            ErrorKind::RepositoryExists => "repository_exists",
            ErrorKind::BranchNotFound => "branch_not_found",
            ErrorKind::BranchExists => "branch_exists",
        };
        f.write_str(name)
    }
}

impl FsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FsError::MalformedAddress(_) => ErrorKind::MalformedAddress,
            FsError::NotFound { .. } => ErrorKind::NotFound,
            FsError::IsDirectory { .. } => ErrorKind::IsDirectory,
            FsError::NotADirectory { .. } => ErrorKind::NotADirectory,
            FsError::DuplicateName { .. } => ErrorKind::DuplicateName,
            FsError::InvalidName(_) => ErrorKind::InvalidName,
            FsError::InvalidMetadata { .. } => ErrorKind::InvalidMetadata,
            FsError::ForeignPath { .. } => ErrorKind::ForeignPath,
            FsError::ConcurrentModification { .. } => ErrorKind::ConcurrentModification,
            FsError::Busy { .. } => ErrorKind::Busy,
            FsError::Cancelled => ErrorKind::Cancelled,
            FsError::RepositoryUnavailable { .. } => ErrorKind::RepositoryUnavailable,
            FsError::RepositoryNotFound { .. } => ErrorKind::RepositoryNotFound,
            FsError::RepositoryExists { .. } => ErrorKind::RepositoryExists,
            FsError::BranchNotFound { .. } => ErrorKind::BranchNotFound,
            FsError::BranchExists { .. } => ErrorKind::BranchExists,
        }
    }

    /// Whether retrying the same call later can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FsError::Busy { .. } | FsError::ConcurrentModification { .. }
        )
    }

    /// Map a storage failure on `repo`.
    ///
    /// A failed ref compare-and-swap means another writer won the race and
    /// a refused entry name is the caller's to fix. Everything else means
    /// the repository cannot serve the request.
    pub(crate) fn storage(repo: &RepoName, err: GitError) -> Self {
        match err {
            GitError::CasFailed {
                refname,
                expected,
                actual,
            } => FsError::ConcurrentModification {
                branch: refname
                    .strip_prefix("refs/heads/")
                    .unwrap_or(&refname)
                    .to_string(),
                expected,
                actual,
            },
            GitError::InvalidEntryName { name } => FsError::InvalidName(NameError {
                name,
                reason: "name is reserved by git",
            }),
            other => FsError::RepositoryUnavailable {
                repo: repo.to_string(),
                message: other.to_string(),
            },
        }
    }

    /// Map a failure to take the branch lock.
    pub(crate) fn lock(repo: &RepoName, branch: &BranchName, err: LockError) -> Self {
        match err {
            LockError::TimedOut { waited } => FsError::Busy {
                branch: branch.to_string(),
                waited,
            },
            LockError::AlreadyLocked => FsError::Busy {
                branch: branch.to_string(),
                waited: Duration::ZERO,
            },
            LockError::Aborted => FsError::Cancelled,
            other => FsError::RepositoryUnavailable {
                repo: repo.to_string(),
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> RepoName {
        RepoName::new("docs").unwrap()
    }

    #[test]
    fn cas_failure_is_concurrent_modification() {
        let err = FsError::storage(
            &repo(),
            GitError::CasFailed {
                refname: "refs/heads/feature/x".into(),
                expected: "a".into(),
                actual: "b".into(),
            },
        );
        match &err {
            FsError::ConcurrentModification { branch, .. } => assert_eq!(branch, "feature/x"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(err.is_retryable());
    }

    #[test]
    fn refused_entry_name_is_invalid_name() {
        let err = FsError::storage(
            &repo(),
            GitError::InvalidEntryName {
                name: ".GIT".into(),
            },
        );
        assert_eq!(err.kind(), ErrorKind::InvalidName);
        assert!(err.to_string().contains(".GIT"));
    }

    #[test]
    fn other_storage_failures_are_unavailable() {
        let err = FsError::storage(
            &repo(),
            GitError::Internal {
                message: "boom".into(),
            },
        );
        assert_eq!(err.kind(), ErrorKind::RepositoryUnavailable);
        assert!(!err.is_retryable());
    }

    #[test]
    fn lock_failures_map_to_busy_and_cancelled() {
        let branch = BranchName::new("master").unwrap();
        let busy = FsError::lock(
            &repo(),
            &branch,
            LockError::TimedOut {
                waited: Duration::from_millis(10),
            },
        );
        assert_eq!(busy.kind(), ErrorKind::Busy);
        assert!(busy.is_retryable());

        let cancelled = FsError::lock(&repo(), &branch, LockError::Aborted);
        assert_eq!(cancelled.kind(), ErrorKind::Cancelled);
        assert!(!cancelled.is_retryable());
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::ConcurrentModification).unwrap();
        assert_eq!(json, "\"concurrent_modification\"");
        assert_eq!(ErrorKind::NotADirectory.to_string(), "not_a_directory");
    }
}
