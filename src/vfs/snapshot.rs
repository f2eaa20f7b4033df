//! vfs::snapshot
//!
//! Reads against one fixed commit.
//!
//! A [`Snapshot`] pins the branch tip at creation time. Everything read
//! through it, including every item a [`Listing`] yields, reflects that
//! commit only; later commits on the branch are visible to new snapshots.

use serde::Serialize;

use super::branch::BranchFs;
use super::record::version_record;
use crate::core::resolver::LogicalPath;
use crate::core::types::{Oid, VersionRecord};
use crate::error::FsError;
use crate::git::{CommitInfo, EntryKind, Git, TreeEntry};

/// Metadata of one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryStat {
    pub is_directory: bool,
    /// Blob size in bytes, or number of children for a directory.
    pub size: u64,
    /// Newest commit that changed the entry, reachable from the snapshot.
    pub last_modifying_commit: Option<Oid>,
}

/// Children of a directory, bound to the snapshot commit.
#[derive(Debug)]
pub struct Listing {
    commit: Oid,
    paths: std::vec::IntoIter<LogicalPath>,
}

impl Listing {
    /// The commit the listing was read from.
    pub fn commit(&self) -> &Oid {
        &self.commit
    }
}

impl Iterator for Listing {
    type Item = LogicalPath;

    fn next(&mut self) -> Option<Self::Item> {
        self.paths.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.paths.size_hint()
    }
}

impl ExactSizeIterator for Listing {}

/// The state of a path in one commit, as compared across history.
type EntryState = Option<(Oid, i32)>;

/// A branch frozen at one commit.
#[derive(Debug, Clone)]
pub struct Snapshot {
    fs: BranchFs,
    commit: Oid,
    tree: Oid,
}

impl Snapshot {
    pub(crate) fn new(fs: BranchFs, commit: Oid, tree: Oid) -> Self {
        Self { fs, commit, tree }
    }

    pub fn commit(&self) -> &Oid {
        &self.commit
    }

    pub fn branch_fs(&self) -> &BranchFs {
        &self.fs
    }

    fn entry(&self, git: &Git, path: &LogicalPath) -> Result<Option<TreeEntry>, FsError> {
        self.fs.check_owned(path)?;
        git.tree_entry(&self.tree, &path.relative_path())
            .map_err(|e| self.fs.storage(e))
    }

    fn not_found(path: &LogicalPath) -> FsError {
        FsError::NotFound {
            path: path.to_string(),
        }
    }

    /// Children of the directory at `path`, in Git name order.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if nothing exists at `path`
    /// - [`FsError::NotADirectory`] if `path` is a file
    pub fn list(&self, path: &LogicalPath) -> Result<Listing, FsError> {
        let git = self.fs.handle().git()?;
        let entry = self
            .entry(&git, path)?
            .ok_or_else(|| Self::not_found(path))?;
        if !entry.is_tree() {
            return Err(FsError::NotADirectory {
                path: path.to_string(),
            });
        }

        let children = git
            .list_tree(&entry.oid)
            .map_err(|e| self.fs.storage(e))?
            .into_iter()
            .map(|child| path.join(&child.name))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Listing {
            commit: self.commit.clone(),
            paths: children.into_iter(),
        })
    }

    /// The full content of the file at `path`.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if nothing exists at `path`
    /// - [`FsError::IsDirectory`] if `path` is a directory
    pub fn read_all(&self, path: &LogicalPath) -> Result<Vec<u8>, FsError> {
        let git = self.fs.handle().git()?;
        let entry = self
            .entry(&git, path)?
            .ok_or_else(|| Self::not_found(path))?;
        match entry.kind {
            EntryKind::Blob => git.read_blob(&entry.oid).map_err(|e| self.fs.storage(e)),
            EntryKind::Tree => Err(FsError::IsDirectory {
                path: path.to_string(),
            }),
            EntryKind::Other => Err(Self::not_found(path)),
        }
    }

    /// Metadata of the entry at `path`.
    pub fn stat(&self, path: &LogicalPath) -> Result<EntryStat, FsError> {
        let git = self.fs.handle().git()?;
        let entry = self
            .entry(&git, path)?
            .ok_or_else(|| Self::not_found(path))?;

        let size = match entry.kind {
            EntryKind::Blob => git.blob_size(&entry.oid),
            EntryKind::Tree => git.list_tree(&entry.oid).map(|c| c.len() as u64),
            EntryKind::Other => Ok(0),
        }
        .map_err(|e| self.fs.storage(e))?;

        Ok(EntryStat {
            is_directory: entry.is_tree(),
            size,
            last_modifying_commit: self.last_change(&git, path)?,
        })
    }

    /// Whether anything exists at `path`.
    pub fn exists(&self, path: &LogicalPath) -> Result<bool, FsError> {
        let git = self.fs.handle().git()?;
        Ok(self.entry(&git, path)?.is_some())
    }

    /// Version records of the commits that changed `path`, oldest first.
    ///
    /// Follows first parents from the snapshot commit. A path that no
    /// longer exists still has the history of its past versions.
    pub fn history(&self, path: &LogicalPath) -> Result<Vec<VersionRecord>, FsError> {
        let git = self.fs.handle().git()?;
        self.fs.check_owned(path)?;

        let mut records = Vec::new();
        self.walk_changes(&git, path, |info| {
            records.push(version_record(info));
            true
        })?;
        records.reverse();
        Ok(records)
    }

    fn last_change(&self, git: &Git, path: &LogicalPath) -> Result<Option<Oid>, FsError> {
        let mut newest = None;
        self.walk_changes(git, path, |info| {
            newest = Some(info.oid.clone());
            false
        })?;
        Ok(newest)
    }

    /// Call `visit` for each commit that changed `path`, newest first,
    /// until it returns false.
    fn walk_changes(
        &self,
        git: &Git,
        path: &LogicalPath,
        mut visit: impl FnMut(&CommitInfo) -> bool,
    ) -> Result<(), FsError> {
        let relative = path.relative_path();
        let state_at = |tree: &Oid| -> Result<EntryState, FsError> {
            Ok(git
                .tree_entry(tree, &relative)
                .map_err(|e| self.fs.storage(e))?
                .map(|entry| (entry.oid, entry.mode)))
        };

        let commits = git
            .first_parent_history(&self.commit)
            .map_err(|e| self.fs.storage(e))?;

        // Each commit is compared with the next one in the walk, which is
        // its first parent.
        let mut newer: Option<(CommitInfo, EntryState)> = None;
        for oid in commits {
            let info = git.commit_info(&oid).map_err(|e| self.fs.storage(e))?;
            let state = state_at(&info.tree)?;
            if let Some((newer_info, newer_state)) = newer.take() {
                if newer_state != state && !visit(&newer_info) {
                    return Ok(());
                }
            }
            newer = Some((info, state));
        }

        if let Some((oldest, state)) = newer {
            if state.is_some() {
                visit(&oldest);
            }
        }
        Ok(())
    }
}
