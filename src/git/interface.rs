//! git::interface
//!
//! Git interface implementation using git2.
//!
//! This module provides the **single doorway** to all Git operations in
//! branchfs. All object and ref access flows through this interface, which
//! returns strong types and normalizes errors into typed failure
//! categories.
//!
//! # Architecture
//!
//! The `Git` struct is the only way to interact with a repository.
//! No other module imports `git2` directly. This ensures:
//!
//! - Consistent error handling across all Git operations
//! - Strong type guarantees at the boundary
//! - CAS (compare-and-swap) semantics for all ref mutations
//!
//! Trees are never edited through an index or work tree; new trees are
//! built directly from the base tree with tree builders, so the provider
//! works on bare repositories.
//!
//! # Error Handling
//!
//! - [`GitError::NotARepo`]: Path is not a Git repository
//! - [`GitError::RefNotFound`]: Requested ref does not exist
//! - [`GitError::CasFailed`]: Compare-and-swap precondition failed
//! - [`GitError::PathConflict`]: A tree edit runs through a non-tree entry
//! - [`GitError::InvalidEntryName`]: A tree edit uses a name Git refuses
//!
//! # Example
//!
//! ```ignore
//! use branchfs::git::{Git, TreeEdit};
//!
//! let git = Git::open(Path::new("/srv/fs/docs.git"))?;
//! let tip = git.resolve_ref(&refname)?;
//! let base = git.commit_info(&tip)?.tree;
//! let blob = git.write_blob(b"hello")?;
//! let tree = git.edit_tree(&base, &[TreeEdit::upsert_blob("docs/readme.txt", blob)])?;
//! let commit = git.create_commit(&tree, &[tip.clone()], &author, "add readme")?;
//! git.update_ref_cas(&refname, &commit, Some(&tip), "branchfs: write")?;
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::core::types::{BranchName, Oid, RefName, TypeError};

/// File mode of a regular blob entry.
pub const FILE_MODE_BLOB: i32 = 0o100644;
/// File mode of a subtree entry.
pub const FILE_MODE_TREE: i32 = 0o040000;

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not a Git repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was opened
        path: PathBuf,
    },

    /// Requested ref does not exist.
    #[error("ref not found: {refname}")]
    RefNotFound {
        /// The ref that was not found
        refname: String,
    },

    /// Compare-and-swap precondition failed.
    ///
    /// The ref's current value differs from the value the caller based its
    /// change on. The ref is left untouched.
    #[error("CAS failed for {refname}: expected {expected}, found {actual}")]
    CasFailed {
        /// The ref being updated
        refname: String,
        /// The expected old value
        expected: String,
        /// The actual current value
        actual: String,
    },

    /// Object not found in repository.
    #[error("object not found: {oid}")]
    ObjectNotFound {
        /// The OID (or lookup context) that was not found
        oid: String,
    },

    /// Invalid object id format.
    #[error("invalid object id: {oid}")]
    InvalidOid {
        /// The invalid OID string
        oid: String,
    },

    /// Invalid ref name format.
    #[error("invalid ref name: {message}")]
    InvalidRefName {
        /// Description of the problem
        message: String,
    },

    /// A tree edit needs a directory where a non-directory entry exists.
    #[error("path conflict at {path}: an ancestor is not a directory")]
    PathConflict {
        /// The edited path
        path: String,
    },

    /// Git refused a name for a tree entry.
    #[error("invalid tree entry name: {name}")]
    InvalidEntryName {
        /// The refused name
        name: String,
    },

    /// Permission or filesystem error.
    #[error("repository access error: {message}")]
    AccessError {
        /// Description of the error
        message: String,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl GitError {
    /// Create a GitError from a git2::Error with richer context.
    fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound if context.starts_with("refs/") => GitError::RefNotFound {
                refname: context.to_string(),
            },
            git2::ErrorCode::NotFound => GitError::ObjectNotFound {
                oid: context.to_string(),
            },
            git2::ErrorCode::InvalidSpec => GitError::InvalidOid {
                oid: context.to_string(),
            },
            git2::ErrorCode::Locked => GitError::AccessError {
                message: format!("repository is locked: {}", err.message()),
            },
            _ => GitError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => GitError::ObjectNotFound {
                oid: err.message().to_string(),
            },
            git2::ErrorCode::InvalidSpec => GitError::InvalidOid {
                oid: err.message().to_string(),
            },
            _ => GitError::Internal {
                message: err.message().to_string(),
            },
        }
    }
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidOid(msg) => GitError::InvalidOid { oid: msg },
            other => GitError::InvalidRefName {
                message: other.to_string(),
            },
        }
    }
}

/// What a tree entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// File content.
    Blob,
    /// Directory.
    Tree,
    /// Submodule commit or anything else the provider does not interpret.
    Other,
}

/// One entry of a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Entry name (last path segment); empty for a root tree.
    pub name: String,
    /// Object the entry points at.
    pub oid: Oid,
    /// Kind of the object.
    pub kind: EntryKind,
    /// Git file mode, e.g. [`FILE_MODE_BLOB`].
    pub mode: i32,
}

impl TreeEntry {
    pub fn is_tree(&self) -> bool {
        self.kind == EntryKind::Tree
    }
}

/// One change applied by [`Git::edit_tree`].
///
/// Paths are relative to the edited tree and `/`-separated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEdit {
    /// Insert or replace the entry at `path`, creating parent trees.
    Upsert { path: String, oid: Oid, mode: i32 },
    /// Remove the entry at `path`; emptied parent trees are pruned.
    Remove { path: String },
}

impl TreeEdit {
    /// Upsert a regular blob.
    pub fn upsert_blob(path: impl Into<String>, oid: Oid) -> Self {
        TreeEdit::Upsert {
            path: path.into(),
            oid,
            mode: FILE_MODE_BLOB,
        }
    }

    pub fn remove(path: impl Into<String>) -> Self {
        TreeEdit::Remove { path: path.into() }
    }
}

/// Author identity and time for a new commit.
#[derive(Debug, Clone)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
    pub time: DateTime<Utc>,
}

/// Information about a commit.
#[derive(Debug, Clone)]
pub struct CommitInfo {
    /// The commit OID
    pub oid: Oid,
    /// Root tree of the commit
    pub tree: Oid,
    /// Parent commits, first parent first
    pub parents: Vec<Oid>,
    /// Full commit message
    pub message: String,
    /// Author name
    pub author_name: String,
    /// Author email
    pub author_email: String,
    /// Author timestamp
    pub author_time: DateTime<Utc>,
}

/// The Git interface.
///
/// This is the **single point of interaction** with Git. `git2`
/// repositories are not `Sync`; open one `Git` per operation (or per
/// thread) rather than sharing it.
pub struct Git {
    /// The underlying git2 repository
    repo: git2::Repository,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl Git {
    // =========================================================================
    // Repository Opening
    // =========================================================================

    /// Open the repository at exactly `path` (bare or not).
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if `path` is not a repository
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::open(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;
        Ok(Self { repo })
    }

    /// Create a new bare repository at `path`.
    pub fn init_bare(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::init_bare(path).map_err(|e| GitError::AccessError {
            message: format!("cannot initialize {}: {}", path.display(), e.message()),
        })?;
        Ok(Self { repo })
    }

    /// Path to the git directory.
    pub fn git_dir(&self) -> &Path {
        self.repo.path()
    }

    pub fn is_bare(&self) -> bool {
        self.repo.is_bare()
    }

    fn raw(oid: &Oid) -> Result<git2::Oid, GitError> {
        git2::Oid::from_str(oid.as_str()).map_err(|e| GitError::from_git2(e, oid.as_str()))
    }

    fn wrap(id: git2::Oid) -> Result<Oid, GitError> {
        Oid::new(id.to_string()).map_err(GitError::from)
    }

    // =========================================================================
    // Refs
    // =========================================================================

    /// Resolve a ref to the commit it points at.
    ///
    /// # Errors
    ///
    /// - [`GitError::RefNotFound`] if the ref doesn't exist
    pub fn resolve_ref(&self, refname: &RefName) -> Result<Oid, GitError> {
        let reference = self
            .repo
            .find_reference(refname.as_str())
            .map_err(|e| GitError::from_git2(e, refname.as_str()))?;

        let commit = reference
            .peel_to_commit()
            .map_err(|e| GitError::from_git2(e, refname.as_str()))?;

        Self::wrap(commit.id())
    }

    /// Resolve a ref, returning None if it doesn't exist.
    pub fn try_resolve_ref(&self, refname: &RefName) -> Result<Option<Oid>, GitError> {
        match self.resolve_ref(refname) {
            Ok(oid) => Ok(Some(oid)),
            Err(GitError::RefNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Raw target of a ref, for CAS error reporting.
    fn try_resolve_ref_raw(&self, refname: &str) -> Result<Option<String>, GitError> {
        match self.repo.find_reference(refname) {
            Ok(reference) => {
                let resolved = reference.resolve().unwrap_or(reference);
                Ok(resolved.target().map(|oid| oid.to_string()))
            }
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::from_git2(e, refname)),
        }
    }

    /// List all local branches, skipping names branchfs cannot represent.
    pub fn list_branches(&self) -> Result<Vec<BranchName>, GitError> {
        let branches = self.repo.branches(Some(git2::BranchType::Local))?;

        let mut names = Vec::new();
        for branch in branches {
            let (branch, _) = branch?;
            if let Some(name) = branch.name().ok().flatten() {
                if let Ok(branch_name) = BranchName::new(name) {
                    names.push(branch_name);
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Update a ref with compare-and-swap semantics.
    ///
    /// The update only succeeds if the ref's current value matches
    /// `expected_old`. If `expected_old` is `None`, the ref must not exist.
    /// The check and the write happen atomically inside libgit2's ref
    /// transaction, so a concurrent writer cannot slip in between.
    ///
    /// # Errors
    ///
    /// - [`GitError::CasFailed`] if the current value doesn't match expected
    pub fn update_ref_cas(
        &self,
        refname: &RefName,
        new_oid: &Oid,
        expected_old: Option<&Oid>,
        message: &str,
    ) -> Result<(), GitError> {
        let new = Self::raw(new_oid)?;

        let result = match expected_old {
            None => self.repo.reference(refname.as_str(), new, false, message),
            Some(expected) => {
                let current = Self::raw(expected)?;
                self.repo
                    .reference_matching(refname.as_str(), new, true, current, message)
            }
        };

        match result {
            Ok(_) => Ok(()),
            Err(e)
                if matches!(
                    e.code(),
                    git2::ErrorCode::Modified
                        | git2::ErrorCode::Exists
                        | git2::ErrorCode::NotFound
                ) =>
            {
                let actual = self
                    .try_resolve_ref_raw(refname.as_str())?
                    .unwrap_or_else(|| "<none>".to_string());
                Err(GitError::CasFailed {
                    refname: refname.to_string(),
                    expected: expected_old
                        .map(|o| o.to_string())
                        .unwrap_or_else(|| "<none>".to_string()),
                    actual,
                })
            }
            Err(e) => Err(GitError::from_git2(e, refname.as_str())),
        }
    }

    // =========================================================================
    // Blobs
    // =========================================================================

    /// Write content as a blob and return its OID.
    pub fn write_blob(&self, content: &[u8]) -> Result<Oid, GitError> {
        let oid = self.repo.blob(content)?;
        Self::wrap(oid)
    }

    /// Read a blob by OID.
    ///
    /// # Errors
    ///
    /// - [`GitError::ObjectNotFound`] if the blob doesn't exist
    pub fn read_blob(&self, oid: &Oid) -> Result<Vec<u8>, GitError> {
        let blob = self
            .repo
            .find_blob(Self::raw(oid)?)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))?;
        Ok(blob.content().to_vec())
    }

    /// Size of a blob in bytes, without copying its content.
    pub fn blob_size(&self, oid: &Oid) -> Result<u64, GitError> {
        let blob = self
            .repo
            .find_blob(Self::raw(oid)?)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))?;
        Ok(blob.size() as u64)
    }

    // =========================================================================
    // Trees
    // =========================================================================

    /// Write (or find) the empty tree.
    pub fn empty_tree(&self) -> Result<Oid, GitError> {
        let oid = self.repo.treebuilder(None)?.write()?;
        Self::wrap(oid)
    }

    /// Look up the entry at `path` inside `tree`.
    ///
    /// An empty path names the tree itself. Returns `Ok(None)` when nothing
    /// exists at `path`, including when the walk runs into a blob.
    pub fn tree_entry(&self, tree: &Oid, path: &str) -> Result<Option<TreeEntry>, GitError> {
        if path.is_empty() {
            return Ok(Some(TreeEntry {
                name: String::new(),
                oid: tree.clone(),
                kind: EntryKind::Tree,
                mode: FILE_MODE_TREE,
            }));
        }

        let root = self
            .repo
            .find_tree(Self::raw(tree)?)
            .map_err(|e| GitError::from_git2(e, tree.as_str()))?;

        match root.get_path(Path::new(path)) {
            Ok(entry) => Self::convert_entry(&entry),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::from_git2(e, path)),
        }
    }

    /// List the entries of a tree in Git order.
    ///
    /// Entries whose names are not UTF-8 are left out.
    pub fn list_tree(&self, tree: &Oid) -> Result<Vec<TreeEntry>, GitError> {
        let tree = self
            .repo
            .find_tree(Self::raw(tree)?)
            .map_err(|e| GitError::from_git2(e, tree.as_str()))?;

        tree.iter()
            .filter_map(|entry| Self::convert_entry(&entry).transpose())
            .collect()
    }

    /// `None` for entries whose name is not UTF-8; no path can address them.
    fn convert_entry(entry: &git2::TreeEntry<'_>) -> Result<Option<TreeEntry>, GitError> {
        let Ok(name) = std::str::from_utf8(entry.name_bytes()) else {
            return Ok(None);
        };
        let kind = match entry.kind() {
            Some(git2::ObjectType::Blob) => EntryKind::Blob,
            Some(git2::ObjectType::Tree) => EntryKind::Tree,
            _ => EntryKind::Other,
        };
        Ok(Some(TreeEntry {
            name: name.to_string(),
            oid: Self::wrap(entry.id())?,
            kind,
            mode: entry.filemode(),
        }))
    }

    /// Apply `edits` in order to `base` and write the resulting tree.
    ///
    /// Upserts create missing parent trees; removes prune parents that end
    /// up empty. Removing a missing entry is a no-op. The root tree itself
    /// cannot be the target of an edit.
    ///
    /// # Errors
    ///
    /// - [`GitError::PathConflict`] if an upsert would descend through a
    ///   non-tree entry, or an edit targets the root
    pub fn edit_tree(&self, base: &Oid, edits: &[TreeEdit]) -> Result<Oid, GitError> {
        let mut root = Self::raw(base)?;

        for edit in edits {
            let (path, target) = match edit {
                TreeEdit::Upsert { path, oid, mode } => (path.as_str(), Some((Self::raw(oid)?, *mode))),
                TreeEdit::Remove { path } => (path.as_str(), None),
            };
            let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
            if segments.is_empty() {
                return Err(GitError::PathConflict {
                    path: path.to_string(),
                });
            }

            root = match self.rewrite_subtree(Some(root), &segments, target, path)? {
                Some(oid) => oid,
                None => self.repo.treebuilder(None)?.write()?,
            };
        }

        Self::wrap(root)
    }

    /// Rewrite one level of the tree. `None` means the level became empty.
    fn rewrite_subtree(
        &self,
        base: Option<git2::Oid>,
        segments: &[&str],
        target: Option<(git2::Oid, i32)>,
        full_path: &str,
    ) -> Result<Option<git2::Oid>, GitError> {
        let Some((head, rest)) = segments.split_first() else {
            return Ok(base);
        };

        let base_tree = base
            .map(|oid| self.repo.find_tree(oid))
            .transpose()
            .map_err(|e| GitError::from_git2(e, full_path))?;
        let mut builder = self.repo.treebuilder(base_tree.as_ref())?;
        let existing = builder.get(*head)?.map(|entry| (entry.id(), entry.kind()));

        if rest.is_empty() {
            match target {
                Some((oid, mode)) => {
                    builder
                        .insert(*head, oid, mode)
                        .map_err(|e| Self::insert_error(e, head))?;
                }
                None if existing.is_none() => return Ok(base),
                None => {
                    builder.remove(*head)?;
                }
            }
        } else {
            let child = match existing {
                Some((id, Some(git2::ObjectType::Tree))) => Some(id),
                _ if target.is_none() => return Ok(base),
                Some(_) => {
                    return Err(GitError::PathConflict {
                        path: full_path.to_string(),
                    })
                }
                None => None,
            };

            match self.rewrite_subtree(child, rest, target, full_path)? {
                Some(oid) => {
                    builder
                        .insert(*head, oid, FILE_MODE_TREE)
                        .map_err(|e| Self::insert_error(e, head))?;
                }
                None => {
                    builder.remove(*head)?;
                }
            }
        }

        if builder.len() == 0 {
            return Ok(None);
        }
        Ok(Some(builder.write()?))
    }

    fn insert_error(err: git2::Error, name: &str) -> GitError {
        if err.class() == git2::ErrorClass::Tree && err.message().contains("invalid name") {
            GitError::InvalidEntryName {
                name: name.to_string(),
            }
        } else {
            GitError::from(err)
        }
    }

    // =========================================================================
    // Commits
    // =========================================================================

    /// Create a commit object without moving any ref.
    ///
    /// The caller advances the branch with [`Git::update_ref_cas`]; if that
    /// fails the commit stays unreachable.
    pub fn create_commit(
        &self,
        tree: &Oid,
        parents: &[Oid],
        author: &CommitAuthor,
        message: &str,
    ) -> Result<Oid, GitError> {
        let tree = self
            .repo
            .find_tree(Self::raw(tree)?)
            .map_err(|e| GitError::from_git2(e, tree.as_str()))?;

        let parents = parents
            .iter()
            .map(|p| {
                self.repo
                    .find_commit(Self::raw(p)?)
                    .map_err(|e| GitError::from_git2(e, p.as_str()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let parent_refs: Vec<&git2::Commit<'_>> = parents.iter().collect();

        let signature = git2::Signature::new(
            &author.name,
            &author.email,
            &git2::Time::new(author.time.timestamp(), 0),
        )?;

        let oid = self
            .repo
            .commit(None, &signature, &signature, message, &tree, &parent_refs)?;
        Self::wrap(oid)
    }

    /// Get information about a commit.
    ///
    /// # Errors
    ///
    /// - [`GitError::ObjectNotFound`] if the commit doesn't exist
    pub fn commit_info(&self, oid: &Oid) -> Result<CommitInfo, GitError> {
        let commit = self
            .repo
            .find_commit(Self::raw(oid)?)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))?;

        let author = commit.author();
        let author_time = DateTime::from_timestamp(author.when().seconds(), 0)
            .unwrap_or(DateTime::UNIX_EPOCH);

        let parents = commit
            .parent_ids()
            .map(Self::wrap)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CommitInfo {
            oid: oid.clone(),
            tree: Self::wrap(commit.tree_id())?,
            parents,
            message: String::from_utf8_lossy(commit.message_bytes()).into_owned(),
            author_name: author.name().unwrap_or("").to_string(),
            author_email: author.email().unwrap_or("").to_string(),
            author_time,
        })
    }

    /// Commits reachable from `tip` along first parents, newest first.
    pub fn first_parent_history(&self, tip: &Oid) -> Result<Vec<Oid>, GitError> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(git2::Sort::TOPOLOGICAL)?;
        revwalk.push(Self::raw(tip)?)?;
        revwalk.simplify_first_parent()?;

        revwalk
            .map(|oid| oid.map_err(GitError::from).and_then(Self::wrap))
            .collect()
    }
}
