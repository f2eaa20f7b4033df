//! core::paths
//!
//! Centralized path routing for provider storage locations.
//!
//! # Storage Layout
//!
//! Repositories live under the registry root as bare repositories:
//! - `<root>/<repo>.git/`
//!
//! The provider keeps its own state inside each repository's git dir:
//! - `<git_dir>/branchfs/` - provider state directory
//! - `<git_dir>/branchfs/locks/<key>.lock` - per-branch mutation locks
//!
//! Lock keys are a hash of the branch name, since branch names may
//! contain `/` and other characters that do not map to a single file name.
//!
//! **Hard rule:** no code outside this module computes `*.join("branchfs")`.
//!
//! # Example
//!
//! ```
//! use branchfs::core::paths::{repository_dir, ProviderPaths};
//! use branchfs::core::types::RepoName;
//! use std::path::{Path, PathBuf};
//!
//! let repo = RepoName::new("bpmn").unwrap();
//! let git_dir = repository_dir(Path::new("/srv/fs"), &repo);
//! assert_eq!(git_dir, PathBuf::from("/srv/fs/bpmn.git"));
//!
//! let paths = ProviderPaths::new(git_dir);
//! assert_eq!(paths.locks_dir(), PathBuf::from("/srv/fs/bpmn.git/branchfs/locks"));
//! ```

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::core::types::{BranchName, RepoName};

/// Directory of a named repository under the registry root.
pub fn repository_dir(root: &Path, repo: &RepoName) -> PathBuf {
    root.join(format!("{}.git", repo.as_str()))
}

/// Provider storage paths for one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderPaths {
    git_dir: PathBuf,
}

impl ProviderPaths {
    pub fn new(git_dir: PathBuf) -> Self {
        Self { git_dir }
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// `<git_dir>/branchfs`
    pub fn state_dir(&self) -> PathBuf {
        self.git_dir.join("branchfs")
    }

    /// `<git_dir>/branchfs/locks`
    pub fn locks_dir(&self) -> PathBuf {
        self.state_dir().join("locks")
    }

    /// Lock file guarding mutations of one branch.
    pub fn branch_lock_path(&self, branch: &BranchName) -> PathBuf {
        self.locks_dir()
            .join(format!("{}.lock", Self::lock_key(branch)))
    }

    /// First 16 bytes of SHA-256 over the branch name, hex encoded.
    fn lock_key(branch: &BranchName) -> String {
        let digest = Sha256::digest(branch.as_str().as_bytes());
        hex::encode(&digest[..16])
    }

    /// Ensure the provider directory structure exists.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.locks_dir())
    }
}
