//! provider
//!
//! URI-driven facade over registry, filesystem views and mutation engine.
//!
//! # Architecture
//!
//! A [`Provider`] owns one [`Registry`] and one [`MutationEngine`], built
//! from a [`Config`]. There is no process-wide instance: callers create a
//! provider and pass it where it is needed. Every entry point takes an
//! address such as `default://master@bpmn/docs/readme.txt`, mounts the
//! repository on first use and delegates.
//!
//! # Example
//!
//! ```ignore
//! let provider = Provider::new(Config::load(None)?)?;
//! provider.create_repository(&RepoName::new("bpmn")?, session.clone())?;
//!
//! let request = CommitRequest::new("Add diagram", session);
//! provider.write("default://master@bpmn/file1.bpmn", b"<xml/>", &request)?;
//! assert_eq!(provider.build_path_from("default://master@bpmn/file1.bpmn")?, "master@/file1.bpmn");
//! ```

use std::collections::BTreeMap;

use tracing::info;

use crate::core::config::{Config, ConfigError};
use crate::core::resolver::{self, Address, LogicalPath};
use crate::core::types::{BranchName, RepoName, SessionInfo, VersionRecord};
use crate::engine::{CommitRequest, EngineSettings, MutationEngine};
use crate::error::FsError;
use crate::observe::ObservablePath;
use crate::registry::Registry;
use crate::vfs::{BranchFs, EntryStat, Listing};

/// Message of the first commit of a new repository.
const INITIAL_COMMIT_MESSAGE: &str = "Initialize repository";

/// The filesystem provider.
#[derive(Debug)]
pub struct Provider {
    config: Config,
    default_branch: BranchName,
    registry: Registry,
    engine: MutationEngine,
}

impl Provider {
    /// Build a provider from configuration.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidValue`] if the default branch is invalid
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let default_branch = config.default_branch()?;
        let registry = Registry::new(config.root());
        let engine = MutationEngine::new(EngineSettings::from_config(&config));
        Ok(Self {
            config,
            default_branch,
            registry,
            engine,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn engine(&self) -> &MutationEngine {
        &self.engine
    }

    // =========================================================================
    // Addressing
    // =========================================================================

    /// Parse an address.
    pub fn resolve(&self, uri: &str) -> Result<Address, FsError> {
        Ok(resolver::parse(uri)?)
    }

    /// Render a path as a URI with the configured scheme.
    pub fn to_uri(&self, path: &LogicalPath) -> String {
        resolver::to_uri(self.config.scheme(), path)
    }

    /// The rendered path string (`<branch>@/<path>`) of an address on a
    /// known repository.
    ///
    /// # Errors
    ///
    /// - [`FsError::MalformedAddress`] if `uri` cannot be parsed
    /// - [`FsError::RepositoryNotFound`] if the repository does not exist
    pub fn build_path_from(&self, uri: &str) -> Result<String, FsError> {
        let address = self.resolve(uri)?;
        self.registry.ensure_mounted(address.path.repo())?;
        Ok(address.path.to_path_string())
    }

    /// A view of one branch, mounting the repository if needed.
    pub fn filesystem(&self, repo: &RepoName, branch: &BranchName) -> Result<BranchFs, FsError> {
        let handle = self.registry.ensure_mounted(repo)?;
        BranchFs::open(handle, branch.clone())
    }

    fn locate(&self, uri: &str) -> Result<(BranchFs, LogicalPath), FsError> {
        let address = self.resolve(uri)?;
        let fs = self.filesystem(address.path.repo(), address.path.branch())?;
        Ok((fs, address.path))
    }

    /// Branches of a repository, sorted.
    pub fn branches(&self, repo: &RepoName) -> Result<Vec<BranchName>, FsError> {
        let handle = self.registry.ensure_mounted(repo)?;
        handle
            .git()?
            .list_branches()
            .map_err(|e| FsError::storage(repo, e))
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn read_all(&self, uri: &str) -> Result<Vec<u8>, FsError> {
        let (fs, path) = self.locate(uri)?;
        fs.read_all(&path)
    }

    pub fn list(&self, uri: &str) -> Result<Listing, FsError> {
        let (fs, path) = self.locate(uri)?;
        fs.list(&path)
    }

    pub fn stat(&self, uri: &str) -> Result<EntryStat, FsError> {
        let (fs, path) = self.locate(uri)?;
        fs.stat(&path)
    }

    pub fn exists(&self, uri: &str) -> Result<bool, FsError> {
        let (fs, path) = self.locate(uri)?;
        fs.exists(&path)
    }

    /// Versions of the entry, oldest first.
    pub fn history(&self, uri: &str) -> Result<Vec<VersionRecord>, FsError> {
        let (fs, path) = self.locate(uri)?;
        fs.history(&path)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    pub fn write(
        &self,
        uri: &str,
        content: &[u8],
        request: &CommitRequest,
    ) -> Result<VersionRecord, FsError> {
        let (fs, path) = self.locate(uri)?;
        self.engine.write(&fs, &path, content, request)
    }

    pub fn rename(
        &self,
        uri: &str,
        new_name: &str,
        request: &CommitRequest,
    ) -> Result<(LogicalPath, VersionRecord), FsError> {
        let (fs, path) = self.locate(uri)?;
        self.engine.rename(&fs, &path, new_name, request)
    }

    pub fn save_and_rename(
        &self,
        uri: &str,
        new_name: &str,
        metadata: &BTreeMap<String, String>,
        content: &[u8],
        request: &CommitRequest,
    ) -> Result<(LogicalPath, VersionRecord), FsError> {
        let (fs, path) = self.locate(uri)?;
        self.engine
            .save_and_rename(&fs, &path, new_name, metadata, content, request)
    }

    pub fn delete(&self, uri: &str, request: &CommitRequest) -> Result<VersionRecord, FsError> {
        let (fs, path) = self.locate(uri)?;
        self.engine.delete(&fs, &path, request)
    }

    /// Copy within one branch; `dest_uri` must name the same repository
    /// and branch.
    pub fn copy(
        &self,
        uri: &str,
        dest_uri: &str,
        request: &CommitRequest,
    ) -> Result<(LogicalPath, VersionRecord), FsError> {
        let (fs, path) = self.locate(uri)?;
        let dest = self.resolve(dest_uri)?.path;
        self.engine.copy(&fs, &path, &dest, request)
    }

    /// Start tracking an existing entry.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if nothing exists at `uri`
    pub fn observe(&self, uri: &str) -> Result<ObservablePath, FsError> {
        let (fs, path) = self.locate(uri)?;
        if !fs.exists(&path)? {
            return Err(FsError::NotFound {
                path: path.to_string(),
            });
        }
        Ok(ObservablePath::new(path))
    }

    // =========================================================================
    // Repositories and branches
    // =========================================================================

    /// Create a repository with its default branch.
    ///
    /// # Errors
    ///
    /// - [`FsError::RepositoryExists`] if the repository exists
    pub fn create_repository(
        &self,
        repo: &RepoName,
        session: SessionInfo,
    ) -> Result<BranchFs, FsError> {
        let handle = self.registry.create(repo)?;
        let request = CommitRequest::new(INITIAL_COMMIT_MESSAGE, session);
        let fs = self
            .engine
            .create_branch(&handle, &self.default_branch, None, &request)?;
        info!(repo = %repo, branch = %self.default_branch, "repository initialized");
        Ok(fs)
    }

    /// Create a branch, from another branch's tip or empty.
    pub fn create_branch(
        &self,
        repo: &RepoName,
        name: &BranchName,
        from: Option<&BranchName>,
        request: &CommitRequest,
    ) -> Result<BranchFs, FsError> {
        let handle = self.registry.ensure_mounted(repo)?;
        self.engine.create_branch(&handle, name, from, request)
    }
}
