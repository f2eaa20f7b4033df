//! registry
//!
//! Name → open repository handle.
//!
//! # Architecture
//!
//! A [`Registry`] owns every repository it mounted. Repositories are bare
//! and live at `<root>/<name>.git` unless mounted from an explicit path.
//! Handles are shared as `Arc<RepositoryHandle>`; a handle does not keep a
//! `git2` repository open (those are not `Sync`), it opens one per
//! operation through [`RepositoryHandle::git`].
//!
//! # Invariants
//!
//! - At most one handle per name
//! - After [`RepositoryHandle::close`] (or unmount) every operation on the
//!   handle fails with [`FsError::RepositoryUnavailable`]
//! - Dropping the registry closes every handle it mounted
//!
//! # Example
//!
//! ```ignore
//! let registry = Registry::new("/srv/fs");
//! let handle = registry.create(&RepoName::new("bpmn")?)?;
//! assert_eq!(registry.get(handle.name())?.git_dir(), handle.git_dir());
//! registry.unmount(handle.name())?;
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use crate::core::paths::{repository_dir, ProviderPaths};
use crate::core::types::RepoName;
use crate::error::FsError;
use crate::git::Git;

/// An open (or closed) repository.
#[derive(Debug)]
pub struct RepositoryHandle {
    name: RepoName,
    paths: ProviderPaths,
    closed: AtomicBool,
}

impl RepositoryHandle {
    fn new(name: RepoName, git_dir: PathBuf) -> Self {
        Self {
            name,
            paths: ProviderPaths::new(git_dir),
            closed: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &RepoName {
        &self.name
    }

    pub fn git_dir(&self) -> &Path {
        self.paths.git_dir()
    }

    pub fn paths(&self) -> &ProviderPaths {
        &self.paths
    }

    pub fn is_open(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }

    /// Close the handle. Idempotent.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!(repo = %self.name, "repository closed");
        }
    }

    /// Fail fast if the handle was closed.
    pub fn ensure_open(&self) -> Result<(), FsError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(FsError::RepositoryUnavailable {
                repo: self.name.to_string(),
                message: "repository is closed".to_string(),
            })
        }
    }

    /// Open the repository for one operation.
    ///
    /// # Errors
    ///
    /// - [`FsError::RepositoryUnavailable`] if the handle is closed or the
    ///   repository cannot be opened
    pub fn git(&self) -> Result<Git, FsError> {
        self.ensure_open()?;
        Git::open(self.git_dir()).map_err(|e| FsError::storage(&self.name, e))
    }
}

/// Mounted repositories by name.
#[derive(Debug)]
pub struct Registry {
    root: PathBuf,
    repos: RwLock<HashMap<RepoName, Arc<RepositoryHandle>>>,
}

impl Registry {
    /// Create an empty registry for repositories under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            repos: RwLock::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Initialize a new bare repository under the root and mount it.
    ///
    /// # Errors
    ///
    /// - [`FsError::RepositoryExists`] if the name is mounted or its
    ///   directory already exists
    pub fn create(&self, name: &RepoName) -> Result<Arc<RepositoryHandle>, FsError> {
        let mut repos = self.repos.write().unwrap_or_else(|e| e.into_inner());
        let git_dir = repository_dir(&self.root, name);
        if repos.contains_key(name) || git_dir.exists() {
            return Err(FsError::RepositoryExists {
                repo: name.to_string(),
            });
        }

        let unavailable = |message: String| FsError::RepositoryUnavailable {
            repo: name.to_string(),
            message,
        };
        fs::create_dir_all(&self.root)
            .map_err(|e| unavailable(format!("cannot create {}: {}", self.root.display(), e)))?;
        let git = Git::init_bare(&git_dir).map_err(|e| FsError::storage(name, e))?;

        let handle = Arc::new(RepositoryHandle::new(name.clone(), git.git_dir().to_path_buf()));
        handle
            .paths()
            .ensure_dirs()
            .map_err(|e| unavailable(format!("cannot create provider state: {}", e)))?;

        info!(repo = %name, path = %git_dir.display(), "repository created");
        repos.insert(name.clone(), Arc::clone(&handle));
        Ok(handle)
    }

    /// Mount `<root>/<name>.git`.
    pub fn mount(&self, name: &RepoName) -> Result<Arc<RepositoryHandle>, FsError> {
        self.mount_at(name, &repository_dir(&self.root, name))
    }

    /// Mount the repository at `path` under `name`.
    ///
    /// Mounting a name that is already mounted returns the existing handle.
    ///
    /// # Errors
    ///
    /// - [`FsError::RepositoryUnavailable`] if `path` is not a repository
    pub fn mount_at(&self, name: &RepoName, path: &Path) -> Result<Arc<RepositoryHandle>, FsError> {
        let mut repos = self.repos.write().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = repos.get(name) {
            debug!(repo = %name, "already mounted");
            return Ok(Arc::clone(existing));
        }

        let git = Git::open(path).map_err(|e| FsError::RepositoryUnavailable {
            repo: name.to_string(),
            message: e.to_string(),
        })?;
        let handle = Arc::new(RepositoryHandle::new(name.clone(), git.git_dir().to_path_buf()));

        info!(repo = %name, path = %handle.git_dir().display(), "repository mounted");
        repos.insert(name.clone(), Arc::clone(&handle));
        Ok(handle)
    }

    /// The handle for a mounted repository.
    ///
    /// # Errors
    ///
    /// - [`FsError::RepositoryNotFound`] if `name` is not mounted
    pub fn get(&self, name: &RepoName) -> Result<Arc<RepositoryHandle>, FsError> {
        self.repos
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
            .ok_or_else(|| FsError::RepositoryNotFound {
                repo: name.to_string(),
            })
    }

    /// The handle for `name`, mounting it from the root on first use.
    ///
    /// # Errors
    ///
    /// - [`FsError::RepositoryNotFound`] if nothing exists at
    ///   `<root>/<name>.git`
    pub fn ensure_mounted(&self, name: &RepoName) -> Result<Arc<RepositoryHandle>, FsError> {
        if let Ok(handle) = self.get(name) {
            return Ok(handle);
        }
        if !repository_dir(&self.root, name).exists() {
            return Err(FsError::RepositoryNotFound {
                repo: name.to_string(),
            });
        }
        self.mount(name)
    }

    pub fn is_mounted(&self, name: &RepoName) -> bool {
        self.repos
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(name)
    }

    /// Close and forget a mounted repository.
    ///
    /// Holders of the handle fail fast from now on.
    pub fn unmount(&self, name: &RepoName) -> Result<(), FsError> {
        let handle = self
            .repos
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(name)
            .ok_or_else(|| FsError::RepositoryNotFound {
                repo: name.to_string(),
            })?;
        handle.close();
        info!(repo = %name, "repository unmounted");
        Ok(())
    }

    /// Names of all mounted repositories, sorted.
    pub fn names(&self) -> Vec<RepoName> {
        let mut names: Vec<RepoName> = self
            .repos
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        let repos = self.repos.get_mut().unwrap_or_else(|e| e.into_inner());
        for (_, handle) in repos.drain() {
            handle.close();
        }
    }
}
