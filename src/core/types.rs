//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`BranchName`] - Validated Git branch name (a mountable root)
//! - [`RepoName`] - Validated repository name as used in addresses
//! - [`Oid`] - Git object identifier (SHA)
//! - [`RefName`] - Validated Git reference name
//! - [`SessionInfo`] - Who is acting, for commit attribution
//! - [`VersionRecord`] - Immutable audit entry for one commit
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, preventing entire classes of bugs.
//!
//! # Examples
//!
//! ```
//! use branchfs::core::types::{BranchName, Oid, RefName, RepoName};
//!
//! let branch = BranchName::new("master").unwrap();
//! let repo = RepoName::new("bpmn").unwrap();
//! let refname = RefName::for_branch(&branch);
//! assert_eq!(refname.as_str(), "refs/heads/master");
//! assert_eq!(repo.as_str(), "bpmn");
//!
//! assert!(BranchName::new("invalid..name").is_err());
//! assert!(RepoName::new("has/slash").is_err());
//! assert!(Oid::new("not-a-sha").is_err());
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid repository name: {0}")]
    InvalidRepoName(String),

    #[error("invalid object id: {0}")]
    InvalidOid(String),

    #[error("invalid ref name: {0}")]
    InvalidRefName(String),

    #[error("invalid session: {0}")]
    InvalidSession(String),
}

/// Check the rules shared by branch names and full ref names
/// (see `git check-ref-format`). Returns the violated rule.
fn check_ref_format(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("cannot be empty".into());
    }
    if name == "@" {
        return Err("cannot be '@' (reserved)".into());
    }
    if name.starts_with('/') || name.ends_with('/') {
        return Err("cannot start or end with '/'".into());
    }
    if name.ends_with('.') {
        return Err("cannot end with '.'".into());
    }

    for forbidden in ["..", "@{", "//"] {
        if name.contains(forbidden) {
            return Err(format!("cannot contain '{forbidden}'"));
        }
    }

    const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];
    if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c)) {
        return Err(format!("cannot contain '{c}'"));
    }
    if name.chars().any(|c| c.is_ascii_control()) {
        return Err("cannot contain control characters".into());
    }

    for component in name.split('/') {
        if component.starts_with('.') {
            return Err("path component cannot start with '.'".into());
        }
        if component.ends_with(".lock") {
            return Err("path component cannot end with '.lock'".into());
        }
    }

    Ok(())
}

/// A validated Git branch name.
///
/// A branch is the root directory of one mounted filesystem. Names follow
/// Git's refname rules and additionally cannot start with `-`.
///
/// # Example
///
/// ```
/// use branchfs::core::types::BranchName;
///
/// let name = BranchName::new("feature/docs").unwrap();
/// assert_eq!(name.as_str(), "feature/docs");
///
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new(".hidden").is_err());
/// assert!(BranchName::new("branch.lock").is_err());
/// assert!(BranchName::new("has space").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if name.starts_with('-') {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot start with '-'".into(),
            ));
        }
        check_ref_format(&name)
            .map_err(|rule| TypeError::InvalidBranchName(format!("branch name {rule}")))?;
        Ok(Self(name))
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated repository name.
///
/// Repository names appear as the host part of an address
/// (`default://master@<repo>/...`) and as the directory name
/// `<root>/<repo>.git`, so they are restricted to `[A-Za-z0-9._-]`,
/// cannot start with `.` and cannot contain `..`.
///
/// # Example
///
/// ```
/// use branchfs::core::types::RepoName;
///
/// assert!(RepoName::new("bpmn").is_ok());
/// assert!(RepoName::new("my-repo.v2").is_ok());
/// assert!(RepoName::new("a@b").is_err());
/// assert!(RepoName::new(".git").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoName(String);

impl RepoName {
    /// Create a new validated repository name.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if name.is_empty() {
            return Err(TypeError::InvalidRepoName(
                "repository name cannot be empty".into(),
            ));
        }
        if name.starts_with('.') || name.contains("..") {
            return Err(TypeError::InvalidRepoName(format!(
                "'{name}' cannot start with '.' or contain '..'"
            )));
        }
        if let Some(c) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
        {
            return Err(TypeError::InvalidRepoName(format!(
                "'{name}' contains '{c}'"
            )));
        }
        Ok(Self(name))
    }

    /// Get the repository name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RepoName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RepoName> for String {
    fn from(name: RepoName) -> Self {
        name.0
    }
}

impl AsRef<str> for RepoName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RepoName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A Git object identifier (SHA-1 or SHA-256).
///
/// OIDs are normalized to lowercase for consistency.
///
/// # Example
///
/// ```
/// use branchfs::core::types::Oid;
///
/// let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(oid.as_str(), "abc123def4567890abc123def4567890abc12345");
/// assert_eq!(oid.short(7), "abc123d");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Create a new validated object id, normalized to lowercase.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` if the string is not a 40 or 64
    /// character hex string.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(
                "object id must be hexadecimal".into(),
            ));
        }
        Ok(Self(oid))
    }

    /// Get an abbreviated form of the OID.
    ///
    /// If `len` exceeds the OID length, returns the full OID.
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }

    /// Get the object id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl AsRef<str> for Oid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated Git reference name.
///
/// # Example
///
/// ```
/// use branchfs::core::types::{BranchName, RefName};
///
/// let branch = BranchName::new("feature/foo").unwrap();
/// let refname = RefName::for_branch(&branch);
/// assert_eq!(refname.as_str(), "refs/heads/feature/foo");
/// assert_eq!(refname.branch(), Some(branch));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RefName(String);

impl RefName {
    /// Prefix of local branch refs.
    pub const HEADS: &'static str = "refs/heads/";

    /// Create a new validated ref name. Must live under `refs/`.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if !name.starts_with("refs/") {
            return Err(TypeError::InvalidRefName(format!(
                "'{name}' is not under refs/"
            )));
        }
        check_ref_format(&name)
            .map_err(|rule| TypeError::InvalidRefName(format!("ref name {rule}")))?;
        Ok(Self(name))
    }

    /// Create a ref name for a branch (`refs/heads/<branch>`).
    pub fn for_branch(branch: &BranchName) -> Self {
        // Branch names are already validated against the same rules.
        Self(format!("{}{}", Self::HEADS, branch.as_str()))
    }

    /// The branch this ref names, if it is a local branch ref.
    pub fn branch(&self) -> Option<BranchName> {
        self.0
            .strip_prefix(Self::HEADS)
            .and_then(|name| BranchName::new(name).ok())
    }

    /// Get the ref name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RefName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RefName> for String {
    fn from(name: RefName) -> Self {
        name.0
    }
}

impl std::fmt::Display for RefName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The acting user and editing session.
///
/// Supplied by the caller on every mutation and never inferred. The user
/// becomes the commit author name, the e-mail (if any) the author e-mail,
/// and the session id is recorded as a `Session-Id` commit trailer.
///
/// # Example
///
/// ```
/// use branchfs::core::types::SessionInfo;
///
/// let session = SessionInfo::new("alice").unwrap().with_id("tab-7").unwrap();
/// assert_eq!(session.user(), "alice");
/// assert_eq!(session.id(), Some("tab-7"));
/// assert!(SessionInfo::new("").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionInfo {
    user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
}

impl SessionInfo {
    /// Create session info for a user.
    ///
    /// # Errors
    ///
    /// The user must be non-empty and free of `<`, `>` and control
    /// characters, which Git signatures cannot hold.
    pub fn new(user: impl Into<String>) -> Result<Self, TypeError> {
        let user = user.into();
        Self::check_field("user", &user)?;
        Ok(Self {
            user,
            id: None,
            email: None,
        })
    }

    /// Attach a session identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        Self::check_field("session id", &id)?;
        if id.contains(char::is_whitespace) {
            return Err(TypeError::InvalidSession(
                "session id cannot contain whitespace".into(),
            ));
        }
        self.id = Some(id);
        Ok(self)
    }

    /// Attach an e-mail address used for the commit author.
    pub fn with_email(mut self, email: impl Into<String>) -> Result<Self, TypeError> {
        let email = email.into();
        Self::check_field("email", &email)?;
        self.email = Some(email);
        Ok(self)
    }

    fn check_field(what: &str, value: &str) -> Result<(), TypeError> {
        if value.trim().is_empty() {
            return Err(TypeError::InvalidSession(format!("{what} cannot be empty")));
        }
        if value.chars().any(|c| c == '<' || c == '>' || c.is_control()) {
            return Err(TypeError::InvalidSession(format!(
                "{what} cannot contain '<', '>' or control characters"
            )));
        }
        Ok(())
    }

    /// Rebuild session info read back from a commit, without validation.
    pub(crate) fn from_commit(user: String, id: Option<String>, email: Option<String>) -> Self {
        Self { user, id, email }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}

impl std::fmt::Display for SessionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{} ({})", self.user, id),
            None => write!(f, "{}", self.user),
        }
    }
}

/// An immutable audit entry for one commit.
///
/// Produced exactly once per successful mutation, and reconstructed from
/// commit objects when reading history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    /// The commit that carries the change.
    pub commit: Oid,
    /// Who made the change.
    pub author: SessionInfo,
    /// Commit time, second precision.
    pub timestamp: DateTime<Utc>,
    /// The caller's commit message, without trailers.
    pub message: String,
    /// Caller metadata stored as commit trailers.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}
