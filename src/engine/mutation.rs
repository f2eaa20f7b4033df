//! engine::mutation
//!
//! Every mutation is one commit.
//!
//! # Commit protocol
//!
//! ```text
//! validate -> lock branch -> read tip -> check expected base
//!          -> build tree -> write commit -> check cancel -> CAS ref -> unlock
//! ```
//!
//! Validation that needs no repository access happens before the lock.
//! Everything from reading the tip to moving the ref happens under the
//! per-branch lock, and the ref only moves through a compare-and-swap
//! against the tip that was read. A failure anywhere leaves the ref where
//! it was; a commit object written before the failure stays unreachable.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

use super::events::{ListenerId, MutationEvent, MutationListener, MutationOp};
use super::request::CommitRequest;
use crate::core::config::Config;
use crate::core::message;
use crate::core::naming::{validate_entry_name, NameError};
use crate::core::ops::{BranchLock, LockError};
use crate::core::resolver::LogicalPath;
use crate::core::types::{BranchName, Oid, RefName, SessionInfo, VersionRecord};
use crate::error::FsError;
use crate::git::{CommitAuthor, CommitInfo, EntryKind, Git, GitError, TreeEdit, FILE_MODE_BLOB};
use crate::observe::ObservablePath;
use crate::registry::RepositoryHandle;
use crate::vfs::{version_record, BranchFs};

/// Engine tunables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// How long a mutation waits for the branch lock before `Busy`.
    pub lock_timeout: Duration,
    /// Domain for author e-mails of sessions that carry none.
    pub email_domain: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            lock_timeout: config.lock_timeout(),
            email_domain: config.email_domain().to_string(),
        }
    }
}

/// The planned effect of a mutation, computed against the base tree.
struct Change {
    edits: Vec<TreeEdit>,
    result: LogicalPath,
}

/// Applies mutations to branches.
pub struct MutationEngine {
    settings: EngineSettings,
    listeners: RwLock<Vec<(ListenerId, Arc<dyn MutationListener>)>>,
    next_listener: AtomicU64,
}

impl std::fmt::Debug for MutationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationEngine")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Default for MutationEngine {
    fn default() -> Self {
        Self::new(EngineSettings::default())
    }
}

impl MutationEngine {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            listeners: RwLock::new(Vec::new()),
            next_listener: AtomicU64::new(0),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    pub fn add_listener(&self, listener: impl MutationListener + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::SeqCst));
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, Arc::new(listener)));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        let before = listeners.len();
        listeners.retain(|(listener, _)| *listener != id);
        listeners.len() != before
    }

    fn emit(&self, event: MutationEvent) {
        let listeners: Vec<Arc<dyn MutationListener>> = self
            .listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener.on_event(&event);
        }
    }

    /// Run one mutation between a `Started` and exactly one terminal event.
    fn tracked(
        &self,
        op: MutationOp,
        path: &LogicalPath,
        body: impl FnOnce() -> Result<(LogicalPath, VersionRecord), FsError>,
    ) -> Result<(LogicalPath, VersionRecord), FsError> {
        self.emit(MutationEvent::Started {
            op,
            path: path.clone(),
        });

        let result = body();
        match &result {
            Ok((result_path, version)) => self.emit(MutationEvent::Succeeded {
                op,
                path: result_path.clone(),
                version: version.clone(),
            }),
            Err(err) => self.emit(MutationEvent::Failed {
                op,
                path: path.clone(),
                kind: err.kind(),
                message: err.to_string(),
            }),
        }
        result
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Create or replace the file at `path`.
    ///
    /// An existing file keeps its mode; missing parent directories are
    /// created.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidName`] for the root or a segment Git cannot store
    /// - [`FsError::IsDirectory`] if a directory exists at `path`
    /// - [`FsError::NotADirectory`] if a parent is a file
    /// - [`FsError::ConcurrentModification`] if the expected base is stale
    #[instrument(level = "debug", skip_all, fields(path = %path))]
    pub fn write(
        &self,
        fs: &BranchFs,
        path: &LogicalPath,
        content: &[u8],
        request: &CommitRequest,
    ) -> Result<VersionRecord, FsError> {
        self.tracked(MutationOp::Write, path, || {
            fs.check_owned(path)?;
            reject_root(path, "the root cannot be written")?;
            check_segments(path)?;

            self.commit_change(MutationOp::Write, fs, request, &BTreeMap::new(), |git, base| {
                let relative = path.relative_path();
                check_parents(fs, git, base, path)?;

                let mode = match git.tree_entry(base, &relative).map_err(|e| fs.storage(e))? {
                    Some(entry) if entry.is_tree() => {
                        return Err(FsError::IsDirectory {
                            path: path.to_string(),
                        })
                    }
                    Some(entry) if entry.kind == EntryKind::Blob => entry.mode,
                    _ => FILE_MODE_BLOB,
                };
                let blob = git.write_blob(content).map_err(|e| fs.storage(e))?;

                Ok(Change {
                    edits: vec![TreeEdit::Upsert {
                        path: relative,
                        oid: blob,
                        mode,
                    }],
                    result: path.clone(),
                })
            })
        })
        .map(|(_, version)| version)
    }

    /// Give the entry at `path` a new name in the same directory.
    ///
    /// The entry's object (file or whole directory) moves as is; no
    /// content is read or rewritten.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidName`] if `new_name` is not a single valid name
    /// - [`FsError::NotFound`] if `path` does not exist
    /// - [`FsError::DuplicateName`] if `new_name` is taken, including when
    ///   it equals the current name
    #[instrument(level = "debug", skip_all, fields(path = %path, new_name))]
    pub fn rename(
        &self,
        fs: &BranchFs,
        path: &LogicalPath,
        new_name: &str,
        request: &CommitRequest,
    ) -> Result<(LogicalPath, VersionRecord), FsError> {
        self.tracked(MutationOp::Rename, path, || {
            self.move_entry(MutationOp::Rename, fs, path, new_name, None, &BTreeMap::new(), request)
        })
    }

    /// Write `content` under `new_name` and remove `path`, as one commit.
    ///
    /// No reader ever sees both names or neither. `metadata` is stored with
    /// the commit and returned in its version record.
    ///
    /// # Errors
    ///
    /// As [`MutationEngine::rename`], plus [`FsError::IsDirectory`] if
    /// `path` is a directory and [`FsError::InvalidMetadata`].
    #[instrument(level = "debug", skip_all, fields(path = %path, new_name))]
    pub fn save_and_rename(
        &self,
        fs: &BranchFs,
        path: &LogicalPath,
        new_name: &str,
        metadata: &BTreeMap<String, String>,
        content: &[u8],
        request: &CommitRequest,
    ) -> Result<(LogicalPath, VersionRecord), FsError> {
        self.tracked(MutationOp::SaveAndRename, path, || {
            self.move_entry(
                MutationOp::SaveAndRename,
                fs,
                path,
                new_name,
                Some(content),
                metadata,
                request,
            )
        })
    }

    /// Shared body of rename (`content` is `None`) and save-and-rename.
    #[allow(clippy::too_many_arguments)]
    fn move_entry(
        &self,
        op: MutationOp,
        fs: &BranchFs,
        path: &LogicalPath,
        new_name: &str,
        content: Option<&[u8]>,
        metadata: &BTreeMap<String, String>,
        request: &CommitRequest,
    ) -> Result<(LogicalPath, VersionRecord), FsError> {
        fs.check_owned(path)?;
        validate_entry_name(new_name)?;
        message::validate_metadata(metadata).map_err(|e| FsError::InvalidMetadata {
            key: e.key,
            reason: e.reason,
        })?;
        reject_root(path, "the root cannot be renamed")?;
        let dest = path.with_name(new_name)?;
        check_segments(&dest)?;

        self.commit_change(op, fs, request, metadata, |git, base| {
            let source = git
                .tree_entry(base, &path.relative_path())
                .map_err(|e| fs.storage(e))?
                .ok_or_else(|| FsError::NotFound {
                    path: path.to_string(),
                })?;
            ensure_absent(fs, git, base, &dest)?;

            let (oid, mode) = match content {
                None => (source.oid, source.mode),
                Some(_) if source.is_tree() => {
                    return Err(FsError::IsDirectory {
                        path: path.to_string(),
                    })
                }
                Some(bytes) => {
                    let blob = git.write_blob(bytes).map_err(|e| fs.storage(e))?;
                    let mode = if source.kind == EntryKind::Blob {
                        source.mode
                    } else {
                        FILE_MODE_BLOB
                    };
                    (blob, mode)
                }
            };

            Ok(Change {
                edits: vec![
                    TreeEdit::remove(path.relative_path()),
                    TreeEdit::Upsert {
                        path: dest.relative_path(),
                        oid,
                        mode,
                    },
                ],
                result: dest.clone(),
            })
        })
    }

    /// Remove the file or directory at `path`.
    ///
    /// Directories left empty are pruned.
    #[instrument(level = "debug", skip_all, fields(path = %path))]
    pub fn delete(
        &self,
        fs: &BranchFs,
        path: &LogicalPath,
        request: &CommitRequest,
    ) -> Result<VersionRecord, FsError> {
        self.tracked(MutationOp::Delete, path, || {
            fs.check_owned(path)?;
            reject_root(path, "the root cannot be deleted")?;

            self.commit_change(MutationOp::Delete, fs, request, &BTreeMap::new(), |git, base| {
                let relative = path.relative_path();
                if git
                    .tree_entry(base, &relative)
                    .map_err(|e| fs.storage(e))?
                    .is_none()
                {
                    return Err(FsError::NotFound {
                        path: path.to_string(),
                    });
                }
                Ok(Change {
                    edits: vec![TreeEdit::remove(relative)],
                    result: path.clone(),
                })
            })
        })
        .map(|(_, version)| version)
    }

    /// Copy the entry at `path` to `dest` on the same branch.
    ///
    /// The copy shares the source's object.
    ///
    /// # Errors
    ///
    /// - [`FsError::ForeignPath`] if `dest` is on another repository or
    ///   branch
    /// - [`FsError::DuplicateName`] if `dest` exists
    /// - [`FsError::InvalidName`] if a segment of `dest` cannot be stored
    #[instrument(level = "debug", skip_all, fields(path = %path, dest = %dest))]
    pub fn copy(
        &self,
        fs: &BranchFs,
        path: &LogicalPath,
        dest: &LogicalPath,
        request: &CommitRequest,
    ) -> Result<(LogicalPath, VersionRecord), FsError> {
        self.tracked(MutationOp::Copy, path, || {
            fs.check_owned(path)?;
            fs.check_owned(dest)?;
            check_segments(dest)?;

            self.commit_change(MutationOp::Copy, fs, request, &BTreeMap::new(), |git, base| {
                let source = git
                    .tree_entry(base, &path.relative_path())
                    .map_err(|e| fs.storage(e))?
                    .ok_or_else(|| FsError::NotFound {
                        path: path.to_string(),
                    })?;
                ensure_absent(fs, git, base, dest)?;
                check_parents(fs, git, base, dest)?;

                Ok(Change {
                    edits: vec![TreeEdit::Upsert {
                        path: dest.relative_path(),
                        oid: source.oid,
                        mode: source.mode,
                    }],
                    result: dest.clone(),
                })
            })
        })
    }

    /// [`MutationEngine::rename`] the path a view currently tracks, then
    /// move the view.
    pub fn rename_observed(
        &self,
        fs: &BranchFs,
        observed: &ObservablePath,
        new_name: &str,
        request: &CommitRequest,
    ) -> Result<VersionRecord, FsError> {
        let (path, version) = self.rename(fs, &observed.current(), new_name, request)?;
        observed.on_path_changed(path);
        Ok(version)
    }

    /// [`MutationEngine::save_and_rename`] the path a view currently
    /// tracks, then move the view.
    pub fn save_and_rename_observed(
        &self,
        fs: &BranchFs,
        observed: &ObservablePath,
        new_name: &str,
        metadata: &BTreeMap<String, String>,
        content: &[u8],
        request: &CommitRequest,
    ) -> Result<VersionRecord, FsError> {
        let (path, version) =
            self.save_and_rename(fs, &observed.current(), new_name, metadata, content, request)?;
        observed.on_path_changed(path);
        Ok(version)
    }

    /// Create branch `name`, starting at `from`'s tip or, without `from`,
    /// at a new commit of the empty tree.
    ///
    /// # Errors
    ///
    /// - [`FsError::BranchExists`] if `name` exists
    /// - [`FsError::BranchNotFound`] if `from` does not exist
    #[instrument(level = "debug", skip_all, fields(repo = %handle.name(), branch = %name))]
    pub fn create_branch(
        &self,
        handle: &Arc<RepositoryHandle>,
        name: &BranchName,
        from: Option<&BranchName>,
        request: &CommitRequest,
    ) -> Result<BranchFs, FsError> {
        let root = LogicalPath::root(handle.name().clone(), name.clone());
        self.tracked(MutationOp::CreateBranch, &root, || {
            let _lock = self.lock_branch(handle, name, request)?;
            let git = handle.git()?;
            let storage = |e: GitError| FsError::storage(handle.name(), e);
            let refname = RefName::for_branch(name);
            let exists = || FsError::BranchExists {
                repo: handle.name().to_string(),
                branch: name.to_string(),
            };

            if git.try_resolve_ref(&refname).map_err(storage)?.is_some() {
                return Err(exists());
            }

            let (start, record) = match from {
                Some(source) => {
                    let start = BranchFs::open(Arc::clone(handle), source.clone())?.tip_in(&git)?;
                    let info = git.commit_info(&start).map_err(storage)?;
                    (start, version_record(&info))
                }
                None => {
                    let tree = git.empty_tree().map_err(storage)?;
                    let raw = message::compose(
                        request.message(),
                        request.session().id(),
                        &BTreeMap::new(),
                    );
                    let author = self.author(request.session());
                    let start = git.create_commit(&tree, &[], &author, &raw).map_err(storage)?;
                    let record = new_commit_record(start.clone(), tree, Vec::new(), author, raw);
                    (start, record)
                }
            };

            check_cancelled(request)?;
            git.update_ref_cas(&refname, &start, None, &reflog_message(MutationOp::CreateBranch, request))
                .map_err(|e| match e {
                    GitError::CasFailed { .. } => exists(),
                    other => storage(other),
                })?;

            debug!(tip = %start, "branch created");
            Ok((root.clone(), record))
        })?;

        BranchFs::open(Arc::clone(handle), name.clone())
    }

    // =========================================================================
    // Commit protocol
    // =========================================================================

    fn lock_branch(
        &self,
        handle: &RepositoryHandle,
        branch: &BranchName,
        request: &CommitRequest,
    ) -> Result<BranchLock, FsError> {
        check_cancelled(request)?;
        handle.ensure_open()?;

        BranchLock::acquire(handle.paths(), branch, self.settings.lock_timeout, || {
            request.is_cancelled()
        })
        .map_err(|e| {
            if let LockError::TimedOut { waited } = &e {
                warn!(repo = %handle.name(), branch = %branch, ?waited, "branch lock timed out");
            }
            FsError::lock(handle.name(), branch, e)
        })
    }

    /// Lock, build, commit and publish one change.
    fn commit_change(
        &self,
        op: MutationOp,
        fs: &BranchFs,
        request: &CommitRequest,
        metadata: &BTreeMap<String, String>,
        build: impl FnOnce(&Git, &Oid) -> Result<Change, FsError>,
    ) -> Result<(LogicalPath, VersionRecord), FsError> {
        let lock = self.lock_branch(fs.handle(), fs.branch(), request)?;
        debug!(lock = %lock.path().display(), "branch lock acquired");

        let git = fs.handle().git()?;
        let tip = fs.tip_in(&git)?;
        if let Some(expected) = request.expected_base() {
            if expected != &tip {
                warn!(branch = %fs.branch(), %expected, actual = %tip, "branch moved past expected base");
                return Err(FsError::ConcurrentModification {
                    branch: fs.branch().to_string(),
                    expected: expected.to_string(),
                    actual: tip.to_string(),
                });
            }
        }

        let base = git.commit_info(&tip).map_err(|e| fs.storage(e))?.tree;
        let change = build(&git, &base)?;
        let tree = git.edit_tree(&base, &change.edits).map_err(|e| match e {
            GitError::PathConflict { path } => FsError::NotADirectory {
                path: fs.path(&path).map(|p| p.to_string()).unwrap_or(path),
            },
            other => fs.storage(other),
        })?;

        let raw = message::compose(request.message(), request.session().id(), metadata);
        let author = self.author(request.session());
        let commit = git
            .create_commit(&tree, &[tip.clone()], &author, &raw)
            .map_err(|e| fs.storage(e))?;
        debug!(%commit, parent = %tip, "commit written");

        check_cancelled(request)?;
        git.update_ref_cas(
            &fs.refname(),
            &commit,
            Some(&tip),
            &reflog_message(op, request),
        )
        .map_err(|e| {
            warn!(branch = %fs.branch(), error = %e, "ref update rejected");
            fs.storage(e)
        })?;
        drop(lock);

        Ok((
            change.result,
            new_commit_record(commit, tree, vec![tip], author, raw),
        ))
    }

    fn author(&self, session: &SessionInfo) -> CommitAuthor {
        let email = session.email().map(str::to_string).unwrap_or_else(|| {
            format!("{}@{}", email_local_part(session.user()), self.settings.email_domain)
        });
        CommitAuthor {
            name: session.user().to_string(),
            email,
            time: now_seconds(),
        }
    }
}

/// The record of a commit this engine just wrote.
///
/// Built from what went into the commit; once the ref has moved nothing
/// may fail.
fn new_commit_record(
    commit: Oid,
    tree: Oid,
    parents: Vec<Oid>,
    author: CommitAuthor,
    message: String,
) -> VersionRecord {
    version_record(&CommitInfo {
        oid: commit,
        tree,
        parents,
        message,
        author_name: author.name,
        author_email: author.email,
        author_time: author.time,
    })
}

fn check_cancelled(request: &CommitRequest) -> Result<(), FsError> {
    if request.is_cancelled() {
        debug!("mutation cancelled");
        Err(FsError::Cancelled)
    } else {
        Ok(())
    }
}

fn reject_root(path: &LogicalPath, reason: &'static str) -> Result<(), FsError> {
    if path.is_root() {
        return Err(FsError::InvalidName(NameError {
            name: path.to_path_string(),
            reason,
        }));
    }
    Ok(())
}

/// Every segment of a target path becomes a tree entry name.
fn check_segments(path: &LogicalPath) -> Result<(), FsError> {
    for segment in path.segments() {
        validate_entry_name(segment)?;
    }
    Ok(())
}

/// Fail with `DuplicateName` if anything exists at `path`.
fn ensure_absent(fs: &BranchFs, git: &Git, base: &Oid, path: &LogicalPath) -> Result<(), FsError> {
    let taken = path.is_root()
        || git
            .tree_entry(base, &path.relative_path())
            .map_err(|e| fs.storage(e))?
            .is_some();
    if taken {
        return Err(FsError::DuplicateName {
            path: path.to_string(),
        });
    }
    Ok(())
}

/// Fail with `NotADirectory` if an existing ancestor of `path` is a file.
fn check_parents(fs: &BranchFs, git: &Git, base: &Oid, path: &LogicalPath) -> Result<(), FsError> {
    let mut ancestor = path.parent();
    let mut ancestors = Vec::new();
    while let Some(dir) = ancestor {
        if dir.is_root() {
            break;
        }
        ancestor = dir.parent();
        ancestors.push(dir);
    }

    // Walk from the top; the first missing directory ends the check.
    for dir in ancestors.into_iter().rev() {
        match git
            .tree_entry(base, &dir.relative_path())
            .map_err(|e| fs.storage(e))?
        {
            Some(entry) if entry.is_tree() => continue,
            Some(_) => {
                return Err(FsError::NotADirectory {
                    path: dir.to_string(),
                })
            }
            None => break,
        }
    }
    Ok(())
}

fn reflog_message(op: MutationOp, request: &CommitRequest) -> String {
    format!("branchfs {}: {}", op, request.session())
}

/// Turn a user name into something usable before the `@`.
fn email_local_part(user: &str) -> String {
    let local: String = user
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '+') {
                c.to_ascii_lowercase()
            } else {
                '.'
            }
        })
        .collect();
    let local = local.trim_matches('.');
    if local.is_empty() {
        "user".to_string()
    } else {
        local.to_string()
    }
}

/// Git stores whole seconds; records carry the same precision.
fn now_seconds() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now)
}
