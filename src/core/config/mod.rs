//! core::config
//!
//! Configuration schema and loading.
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Config file
//! 3. CLI flags (applied by the caller through the `with_*` builders)
//!
//! # Config Locations
//!
//! Searched in order, first hit wins:
//! 1. An explicit path (`--config`)
//! 2. `$BRANCHFS_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/branchfs/config.toml`
//! 4. `~/.branchfs/config.toml`
//!
//! # Example
//!
//! ```no_run
//! use branchfs::core::config::Config;
//!
//! let config = Config::load(None).unwrap();
//! println!("Root: {}", config.root().display());
//! println!("Lock timeout: {:?}", config.lock_timeout());
//! ```

pub mod schema;

pub use schema::{AuthorConfig, FileConfig, LockingConfig};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::core::types::BranchName;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "BRANCHFS_CONFIG";

const DEFAULT_SCHEME: &str = "default";
const DEFAULT_BRANCH: &str = "master";
const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5000;
const DEFAULT_EMAIL_DOMAIN: &str = "branchfs.local";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Effective provider configuration.
///
/// Accessors apply defaults for anything the file leaves out.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Values read from the config file
    pub file: FileConfig,
    /// Path the file was loaded from, if any
    loaded_from: Option<PathBuf>,
}

impl Config {
    /// Load configuration, searching the standard locations.
    ///
    /// An explicit path must exist; the other locations are optional.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read, parsed
    /// or validated. Missing config files are not an error (defaults are
    /// used).
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        match Self::find_config_file() {
            Some(path) => Self::from_file(&path),
            None => {
                debug!("no config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load and validate one config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let file: FileConfig = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        file.validate()?;

        debug!(path = %path.display(), "loaded config");
        Ok(Self {
            file,
            loaded_from: Some(path.to_path_buf()),
        })
    }

    fn find_config_file() -> Option<PathBuf> {
        // 1. Check $BRANCHFS_CONFIG
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. Check $XDG_CONFIG_HOME/branchfs/config.toml
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("branchfs/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        // 3. Check ~/.branchfs/config.toml
        dirs::home_dir()
            .map(|home| home.join(".branchfs/config.toml"))
            .filter(|path| path.exists())
    }

    /// Override the registry root.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.file.root = Some(root.into());
        self
    }

    /// Override the lock wait.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        let locking = self.file.locking.get_or_insert_with(LockingConfig::default);
        locking.timeout_ms = Some(timeout.as_millis().max(1) as u64);
        self
    }

    // =========================================================================
    // Accessor methods with defaults
    // =========================================================================

    /// Directory holding the repositories.
    ///
    /// Defaults to `<data dir>/branchfs`, or `.branchfs` when the platform
    /// has no data directory.
    pub fn root(&self) -> PathBuf {
        self.file
            .root
            .clone()
            .or_else(|| dirs::data_dir().map(|dir| dir.join("branchfs")))
            .unwrap_or_else(|| PathBuf::from(".branchfs"))
    }

    /// Scheme used when rendering URIs. Defaults to "default".
    pub fn scheme(&self) -> &str {
        self.file.scheme.as_deref().unwrap_or(DEFAULT_SCHEME)
    }

    /// Branch created for new repositories. Defaults to "master".
    pub fn default_branch(&self) -> Result<BranchName, ConfigError> {
        let name = self.file.default_branch.as_deref().unwrap_or(DEFAULT_BRANCH);
        BranchName::new(name).map_err(|e| ConfigError::InvalidValue(e.to_string()))
    }

    /// How long a mutation waits for its branch lock. Defaults to 5s.
    pub fn lock_timeout(&self) -> Duration {
        let ms = self
            .file
            .locking
            .as_ref()
            .and_then(|l| l.timeout_ms)
            .unwrap_or(DEFAULT_LOCK_TIMEOUT_MS);
        Duration::from_millis(ms)
    }

    /// Domain used for `<user>@<domain>` author e-mails.
    pub fn email_domain(&self) -> &str {
        self.file
            .author
            .as_ref()
            .and_then(|a| a.email_domain.as_deref())
            .unwrap_or(DEFAULT_EMAIL_DOMAIN)
    }

    /// Get the path to the loaded config file.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.loaded_from.as_deref()
    }
}
