//! vfs::branch
//!
//! One repository + branch as a directory tree.

use std::sync::Arc;

use super::snapshot::{EntryStat, Listing, Snapshot};
use crate::core::resolver::LogicalPath;
use crate::core::types::{BranchName, Oid, RefName, RepoName, VersionRecord};
use crate::error::FsError;
use crate::git::{Git, GitError};
use crate::registry::RepositoryHandle;

/// A branch of a mounted repository, read as a filesystem.
///
/// Read operations resolve the branch tip once and answer from that
/// commit. Use [`BranchFs::snapshot`] to run several reads against the
/// same commit.
#[derive(Debug, Clone)]
pub struct BranchFs {
    handle: Arc<RepositoryHandle>,
    branch: BranchName,
}

impl BranchFs {
    /// Bind to `branch`, which must exist.
    ///
    /// # Errors
    ///
    /// - [`FsError::BranchNotFound`] if the branch ref does not exist
    /// - [`FsError::RepositoryUnavailable`] if the handle is closed
    pub fn open(handle: Arc<RepositoryHandle>, branch: BranchName) -> Result<Self, FsError> {
        let fs = Self { handle, branch };
        fs.tip()?;
        Ok(fs)
    }

    pub fn handle(&self) -> &Arc<RepositoryHandle> {
        &self.handle
    }

    pub fn repo(&self) -> &RepoName {
        self.handle.name()
    }

    pub fn branch(&self) -> &BranchName {
        &self.branch
    }

    pub fn refname(&self) -> RefName {
        RefName::for_branch(&self.branch)
    }

    /// The root directory.
    pub fn root(&self) -> LogicalPath {
        LogicalPath::root(self.repo().clone(), self.branch.clone())
    }

    /// A path on this branch from a `/`-separated relative path.
    pub fn path(&self, relative: &str) -> Result<LogicalPath, FsError> {
        Ok(LogicalPath::from_relative(
            self.repo().clone(),
            self.branch.clone(),
            relative,
        )?)
    }

    /// The commit the branch currently points at.
    pub fn tip(&self) -> Result<Oid, FsError> {
        let git = self.handle.git()?;
        self.tip_in(&git)
    }

    pub(crate) fn tip_in(&self, git: &Git) -> Result<Oid, FsError> {
        git.try_resolve_ref(&self.refname())
            .map_err(|e| self.storage(e))?
            .ok_or_else(|| FsError::BranchNotFound {
                repo: self.repo().to_string(),
                branch: self.branch.to_string(),
            })
    }

    /// Pin the current tip for a series of reads.
    pub fn snapshot(&self) -> Result<Snapshot, FsError> {
        let git = self.handle.git()?;
        let tip = self.tip_in(&git)?;
        let tree = git.commit_info(&tip).map_err(|e| self.storage(e))?.tree;
        Ok(Snapshot::new(self.clone(), tip, tree))
    }

    /// Children of a directory. See [`Snapshot::list`].
    pub fn list(&self, path: &LogicalPath) -> Result<Listing, FsError> {
        self.snapshot()?.list(path)
    }

    /// Content of a file. See [`Snapshot::read_all`].
    pub fn read_all(&self, path: &LogicalPath) -> Result<Vec<u8>, FsError> {
        self.snapshot()?.read_all(path)
    }

    pub fn stat(&self, path: &LogicalPath) -> Result<EntryStat, FsError> {
        self.snapshot()?.stat(path)
    }

    pub fn exists(&self, path: &LogicalPath) -> Result<bool, FsError> {
        self.snapshot()?.exists(path)
    }

    /// Versions of `path`, oldest first. See [`Snapshot::history`].
    pub fn history(&self, path: &LogicalPath) -> Result<Vec<VersionRecord>, FsError> {
        self.snapshot()?.history(path)
    }

    /// The rendered form `<branch>@/<path>` of a path on this branch.
    pub fn path_string(&self, path: &LogicalPath) -> Result<String, FsError> {
        self.check_owned(path)?;
        Ok(path.to_path_string())
    }

    /// Reject paths from another repository or branch.
    pub(crate) fn check_owned(&self, path: &LogicalPath) -> Result<(), FsError> {
        if path.repo() == self.repo() && path.branch() == &self.branch {
            Ok(())
        } else {
            Err(FsError::ForeignPath {
                path: path.to_string(),
                expected: format!("{}@{}", self.branch, self.repo()),
            })
        }
    }

    pub(crate) fn storage(&self, err: GitError) -> FsError {
        FsError::storage(self.repo(), err)
    }
}
