//! core::naming
//!
//! Entry naming rules.
//!
//! A rename target or a path segment is a single tree entry name, so it
//! must be something Git can store in a tree and that cannot be confused
//! with path navigation.

use thiserror::Error;

/// A rejected entry name.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid name '{name}': {reason}")]
pub struct NameError {
    pub name: String,
    pub reason: &'static str,
}

/// Validate a single entry name.
///
/// # Example
///
/// ```
/// use branchfs::core::naming::validate_entry_name;
///
/// assert!(validate_entry_name("readme2.txt").is_ok());
/// assert!(validate_entry_name("").is_err());
/// assert!(validate_entry_name("docs/readme.txt").is_err());
/// assert!(validate_entry_name("..").is_err());
/// assert!(validate_entry_name(".GIT").is_err());
/// ```
pub fn validate_entry_name(name: &str) -> Result<(), NameError> {
    let reason = if name.is_empty() {
        Some("name cannot be empty")
    } else if name.contains('/') || name.contains('\\') {
        Some("name cannot contain path separators")
    } else if name == "." || name == ".." {
        Some("name cannot be '.' or '..'")
    } else if is_reserved_by_git(name) {
        Some("name is reserved by git")
    } else if name.chars().any(char::is_control) {
        Some("name cannot contain control characters")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(NameError {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Names Git refuses to store as tree entries.
///
/// Git compares `.git` without regard to case and also refuses the forms
/// that alias it on NTFS: trailing dots or spaces, an alternate data
/// stream suffix and the `git~1` short name.
fn is_reserved_by_git(name: &str) -> bool {
    let stem = name.split(':').next().unwrap_or(name);
    let stem = stem.trim_end_matches(['.', ' ']);
    stem.eq_ignore_ascii_case(".git") || stem.eq_ignore_ascii_case("git~1")
}
