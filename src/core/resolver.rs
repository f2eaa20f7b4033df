//! core::resolver
//!
//! Addressing: parsing and rendering of filesystem addresses.
//!
//! # Forms
//!
//! - URI form: `<scheme>://<branch>@<repo>/<segment>/.../<name>[.<ext>]`
//! - Rendered path form: `<branch>@/<segment>/.../<name>[.<ext>]`
//!
//! The rendered form deliberately drops the repository name. Consumers
//! that parse the rendered string expect exactly this shape, so it must
//! not change.
//!
//! Everything in this module is pure; nothing touches a repository.
//!
//! # Example
//!
//! ```
//! use branchfs::core::resolver::{file_extension, parse, path_without_file_extension};
//!
//! let address = parse("default://master@bpmn/file1.bpmn").unwrap();
//! assert_eq!(address.path.branch().as_str(), "master");
//! assert_eq!(address.path.repo().as_str(), "bpmn");
//! assert_eq!(address.path.to_path_string(), "master@/file1.bpmn");
//!
//! assert_eq!(file_extension("/a/b/c/file.txt"), Some(".txt"));
//! assert_eq!(path_without_file_extension("/a/b/c/file.txt"), "/a/b/c/file");
//! ```

use thiserror::Error;

use crate::core::naming::validate_entry_name;
use crate::core::types::{BranchName, RepoName};

/// Separator between scheme and the rest of a URI.
pub const SCHEME_SEPARATOR: &str = "://";

/// An address that cannot be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("malformed address '{address}': {reason}")]
pub struct AddressError {
    /// The offending input.
    pub address: String,
    /// What is wrong with it.
    pub reason: String,
}

impl AddressError {
    fn new(address: &str, reason: impl Into<String>) -> Self {
        Self {
            address: address.to_string(),
            reason: reason.into(),
        }
    }
}

/// A normalized (repository, branch, segments) triple.
///
/// # Invariants
///
/// - No segment is empty, `.` or `..`
/// - No segment contains `/`
///
/// Two paths are equal iff repository, branch and segments are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LogicalPath {
    repo: RepoName,
    branch: BranchName,
    segments: Vec<String>,
}

impl LogicalPath {
    /// The root directory of a branch.
    pub fn root(repo: RepoName, branch: BranchName) -> Self {
        Self {
            repo,
            branch,
            segments: Vec::new(),
        }
    }

    /// Build a path from raw segments, normalizing them.
    ///
    /// Segments may themselves contain `/`; they are split. Empty and `.`
    /// segments are dropped, `..` is rejected.
    pub fn new<I, S>(repo: RepoName, branch: BranchName, segments: I) -> Result<Self, AddressError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let raw: Vec<S> = segments.into_iter().collect();
        let joined = raw.iter().map(AsRef::as_ref).collect::<Vec<_>>().join("/");
        let segments = normalize(&joined, &joined)?;
        Ok(Self {
            repo,
            branch,
            segments,
        })
    }

    /// Build a path from a `/`-separated path relative to the branch root.
    pub fn from_relative(
        repo: RepoName,
        branch: BranchName,
        path: &str,
    ) -> Result<Self, AddressError> {
        Ok(Self {
            repo,
            branch,
            segments: normalize(path, path)?,
        })
    }

    pub fn repo(&self) -> &RepoName {
        &self.repo
    }

    pub fn branch(&self) -> &BranchName {
        &self.branch
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Whether this is the branch root.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The last segment, or `None` for the root.
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// The containing directory, or `None` for the root.
    pub fn parent(&self) -> Option<LogicalPath> {
        if self.is_root() {
            return None;
        }
        let mut parent = self.clone();
        parent.segments.pop();
        Some(parent)
    }

    /// A child of this path. `name` may contain `/` to descend further.
    pub fn join(&self, name: &str) -> Result<LogicalPath, AddressError> {
        let mut child = self.clone();
        child.segments.extend(normalize(name, name)?);
        Ok(child)
    }

    /// The entry with the same parent and a different last segment.
    pub fn with_name(&self, name: &str) -> Result<LogicalPath, AddressError> {
        let parent = self
            .parent()
            .ok_or_else(|| AddressError::new(&self.to_path_string(), "the root has no name"))?;
        validate_entry_name(name).map_err(|e| AddressError::new(name, e.reason))?;
        let mut sibling = parent;
        sibling.segments.push(name.to_string());
        Ok(sibling)
    }

    /// Whether both paths live on the same repository and branch.
    pub fn same_filesystem(&self, other: &LogicalPath) -> bool {
        self.repo == other.repo && self.branch == other.branch
    }

    /// Whether `self` equals `ancestor` or lies below it.
    pub fn starts_with(&self, ancestor: &LogicalPath) -> bool {
        self.same_filesystem(ancestor) && self.segments.starts_with(&ancestor.segments)
    }

    /// The path relative to the branch root, as stored in Git trees.
    pub fn relative_path(&self) -> String {
        self.segments.join("/")
    }

    /// The rendered form `<branch>@/<segments>`.
    pub fn to_path_string(&self) -> String {
        to_path_string(&self.branch, &self.segments)
    }

    /// The extension of the last segment, including the dot.
    pub fn file_extension(&self) -> Option<&str> {
        self.name().and_then(file_extension)
    }
}

impl std::fmt::Display for LogicalPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}/{}", self.branch, self.repo, self.relative_path())
    }
}

/// A parsed URI: the scheme plus the logical path it names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    pub scheme: String,
    pub path: LogicalPath,
}

impl Address {
    /// Render back to `<scheme>://<branch>@<repo>/<segments>`.
    pub fn to_uri(&self) -> String {
        to_uri(&self.scheme, &self.path)
    }
}

impl std::str::FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

/// Render a path as a URI with the given scheme.
pub fn to_uri(scheme: &str, path: &LogicalPath) -> String {
    format!(
        "{}{}{}@{}/{}",
        scheme,
        SCHEME_SEPARATOR,
        path.branch,
        path.repo,
        path.relative_path()
    )
}

/// Parse `<scheme>://<branch>@<repo>/<path...>`.
///
/// Branch names may contain `@` and `/`, repository names may not. The
/// split point is the first `@` whose following token (up to the next `/`)
/// is a valid repository name.
///
/// # Errors
///
/// [`AddressError`] if the scheme separator or `@` is missing, if the
/// scheme, branch or repository token is empty or invalid, or if the path
/// contains a `..` segment.
pub fn parse(uri: &str) -> Result<Address, AddressError> {
    let (scheme, rest) = uri
        .split_once(SCHEME_SEPARATOR)
        .ok_or_else(|| AddressError::new(uri, "missing scheme separator '://'"))?;
    check_scheme(uri, scheme)?;

    let mut at_positions = rest.match_indices('@').map(|(i, _)| i).peekable();
    let first_at = *at_positions
        .peek()
        .ok_or_else(|| AddressError::new(uri, "missing '@' between branch and repository"))?;

    for at in at_positions {
        let (repo, path) = rest[at + 1..].split_once('/').unwrap_or((&rest[at + 1..], ""));
        if let Ok(repo) = RepoName::new(repo) {
            let branch_token = &rest[..at];
            if branch_token.is_empty() {
                return Err(AddressError::new(uri, "branch is empty"));
            }
            let branch = BranchName::new(branch_token)
                .map_err(|e| AddressError::new(uri, e.to_string()))?;
            return Ok(Address {
                scheme: scheme.to_string(),
                path: LogicalPath {
                    repo,
                    branch,
                    segments: normalize(path, uri)?,
                },
            });
        }
    }

    let repo_token = rest[first_at + 1..].split('/').next().unwrap_or("");
    if first_at == 0 {
        Err(AddressError::new(uri, "branch is empty"))
    } else if repo_token.is_empty() {
        Err(AddressError::new(uri, "repository is empty"))
    } else {
        Err(AddressError::new(
            uri,
            format!("invalid repository name '{repo_token}'"),
        ))
    }
}

/// Parse the rendered form `<branch>@/<path>` for a known repository.
///
/// # Example
///
/// ```
/// use branchfs::core::resolver::parse_path_string;
/// use branchfs::core::types::RepoName;
///
/// let repo = RepoName::new("bpmn").unwrap();
/// let path = parse_path_string(&repo, "master@/docs/readme.txt").unwrap();
/// assert_eq!(path.relative_path(), "docs/readme.txt");
/// ```
pub fn parse_path_string(repo: &RepoName, rendered: &str) -> Result<LogicalPath, AddressError> {
    let (branch, path) = rendered
        .split_once("@/")
        .ok_or_else(|| AddressError::new(rendered, "missing '@/' after branch"))?;
    if branch.is_empty() {
        return Err(AddressError::new(rendered, "branch is empty"));
    }
    let branch = BranchName::new(branch).map_err(|e| AddressError::new(rendered, e.to_string()))?;
    Ok(LogicalPath {
        repo: repo.clone(),
        branch,
        segments: normalize(path, rendered)?,
    })
}

/// Render `<branch>@/<segments joined by '/'>`.
///
/// The filesystem (repository) name is not part of the result.
pub fn to_path_string<S: AsRef<str>>(branch: &BranchName, segments: &[S]) -> String {
    let joined = segments
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("/");
    format!("{}@/{}", branch, joined)
}

/// Split a `/`-separated path into normalized segments.
///
/// `None` yields zero segments instead of an error, so callers probing
/// several formats can treat it as "no match".
///
/// # Example
///
/// ```
/// use branchfs::core::resolver::split_segments;
///
/// assert!(split_segments(None).unwrap().is_empty());
/// assert_eq!(split_segments(Some("/a//b/./c")).unwrap(), vec!["a", "b", "c"]);
/// assert!(split_segments(Some("a/../b")).is_err());
/// ```
pub fn split_segments(path: Option<&str>) -> Result<Vec<String>, AddressError> {
    match path {
        None => Ok(Vec::new()),
        Some(path) => normalize(path, path),
    }
}

/// The last segment's suffix from its final `.`, including the dot.
///
/// Returns `None` if the last segment has no dot or its only dot is the
/// first character (`.gitignore`).
pub fn file_extension(path: &str) -> Option<&str> {
    let name_start = path.rfind('/').map_or(0, |i| i + 1);
    match path[name_start..].rfind('.') {
        None | Some(0) => None,
        Some(dot) => Some(&path[name_start + dot..]),
    }
}

/// `path` with [`file_extension`] stripped; identity if there is none.
pub fn path_without_file_extension(path: &str) -> &str {
    match file_extension(path) {
        Some(ext) => &path[..path.len() - ext.len()],
        None => path,
    }
}

/// Check that `scheme` is usable in a URI (`[A-Za-z][A-Za-z0-9+.-]*`).
pub fn validate_scheme(scheme: &str) -> Result<(), AddressError> {
    check_scheme(scheme, scheme)
}

fn check_scheme(uri: &str, scheme: &str) -> Result<(), AddressError> {
    let mut chars = scheme.chars();
    match chars.next() {
        None => Err(AddressError::new(uri, "scheme is empty")),
        Some(first) if !first.is_ascii_alphabetic() => {
            Err(AddressError::new(uri, "scheme must start with a letter"))
        }
        Some(_) if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) => {
            Err(AddressError::new(uri, "scheme contains invalid characters"))
        }
        Some(_) => Ok(()),
    }
}

fn normalize(path: &str, address: &str) -> Result<Vec<String>, AddressError> {
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(AddressError::new(address, "'..' segments are not allowed")),
            other => segments.push(other.to_string()),
        }
    }
    Ok(segments)
}
