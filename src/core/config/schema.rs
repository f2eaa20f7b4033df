//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Config File
//!
//! Located at (in order of precedence):
//! 1. `--config <path>` on the command line
//! 2. `$BRANCHFS_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/branchfs/config.toml`
//! 4. `~/.branchfs/config.toml`
//!
//! # Validation
//!
//! Config values are validated after parsing to ensure they conform to
//! expected formats (e.g., the default branch must be a valid branch name).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::resolver::validate_scheme;
use crate::core::types::BranchName;

/// Upper bound on the configured lock wait.
pub const MAX_LOCK_TIMEOUT_MS: u64 = 10 * 60 * 1000;

/// Provider configuration file.
///
/// # Example
///
/// ```toml
/// root = "/var/lib/branchfs"
/// scheme = "default"
/// default_branch = "master"
///
/// [locking]
/// timeout_ms = 5000
///
/// [author]
/// email_domain = "branchfs.local"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Directory holding `<repo>.git` repositories
    pub root: Option<PathBuf>,

    /// Scheme used when rendering URIs
    pub scheme: Option<String>,

    /// Branch created by repository initialization
    pub default_branch: Option<String>,

    /// Mutation lock settings
    pub locking: Option<LockingConfig>,

    /// Commit author settings
    pub author: Option<AuthorConfig>,
}

impl FileConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(root) = &self.root {
            if root.as_os_str().is_empty() {
                return Err(ConfigError::InvalidValue("root cannot be empty".to_string()));
            }
        }

        if let Some(scheme) = &self.scheme {
            validate_scheme(scheme)
                .map_err(|e| ConfigError::InvalidValue(format!("invalid scheme: {}", e.reason)))?;
        }

        if let Some(branch) = &self.default_branch {
            BranchName::new(branch).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid default branch name: {}", e))
            })?;
        }

        if let Some(locking) = &self.locking {
            locking.validate()?;
        }
        if let Some(author) = &self.author {
            author.validate()?;
        }

        Ok(())
    }
}

/// Mutation lock settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LockingConfig {
    /// How long a mutation waits for the branch lock
    pub timeout_ms: Option<u64>,
}

impl LockingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.timeout_ms {
            Some(0) => Err(ConfigError::InvalidValue(
                "locking.timeout_ms must be positive".to_string(),
            )),
            Some(ms) if ms > MAX_LOCK_TIMEOUT_MS => Err(ConfigError::InvalidValue(format!(
                "locking.timeout_ms must be at most {}",
                MAX_LOCK_TIMEOUT_MS
            ))),
            _ => Ok(()),
        }
    }
}

/// Commit author settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AuthorConfig {
    /// Domain of the e-mail synthesized for sessions without one
    pub email_domain: Option<String>,
}

impl AuthorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(domain) = &self.email_domain {
            let bad = domain.is_empty()
                || domain
                    .chars()
                    .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '@' | '<' | '>'));
            if bad {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid author.email_domain '{}'",
                    domain
                )));
            }
        }
        Ok(())
    }
}
