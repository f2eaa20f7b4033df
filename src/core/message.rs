//! core::message
//!
//! Commit message layout.
//!
//! A mutation commit carries the caller's message followed, after a blank
//! line, by a block of `Key: value` trailers: the session id under
//! [`SESSION_TRAILER`] and any caller metadata. Reading history parses the
//! trailers back out of the last paragraph, and only when every line of
//! that paragraph is a trailer.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use branchfs::core::message::{compose, parse};
//!
//! let mut metadata = BTreeMap::new();
//! metadata.insert("Reviewed-By".to_string(), "carol".to_string());
//!
//! let raw = compose("Rename diagram", Some("tab-7"), &metadata);
//! assert_eq!(raw, "Rename diagram\n\nSession-Id: tab-7\nReviewed-By: carol\n");
//!
//! let parsed = parse(&raw);
//! assert_eq!(parsed.message, "Rename diagram");
//! assert_eq!(parsed.session_id.as_deref(), Some("tab-7"));
//! assert_eq!(parsed.metadata, metadata);
//! ```

use std::collections::BTreeMap;

use thiserror::Error;

/// Trailer key holding the session id.
pub const SESSION_TRAILER: &str = "Session-Id";

/// A metadata entry that cannot be stored as a trailer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid metadata '{key}': {reason}")]
pub struct MetadataError {
    pub key: String,
    pub reason: &'static str,
}

/// A commit message split into text and trailers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedMessage {
    pub message: String,
    pub session_id: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

fn is_trailer_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Check that every entry can round-trip through a trailer.
pub fn validate_metadata(metadata: &BTreeMap<String, String>) -> Result<(), MetadataError> {
    for (key, value) in metadata {
        let reason = if !is_trailer_key(key) {
            Some("keys may only contain ASCII letters, digits and '-'")
        } else if key.eq_ignore_ascii_case(SESSION_TRAILER) {
            Some("key is reserved")
        } else if value.chars().any(char::is_control) {
            Some("values must be a single line")
        } else if value.trim() != value {
            Some("values cannot start or end with whitespace")
        } else {
            None
        };

        if let Some(reason) = reason {
            return Err(MetadataError {
                key: key.clone(),
                reason,
            });
        }
    }
    Ok(())
}

/// Build the raw commit message.
///
/// Metadata is expected to have passed [`validate_metadata`].
pub fn compose(
    message: &str,
    session_id: Option<&str>,
    metadata: &BTreeMap<String, String>,
) -> String {
    let body = message.trim_end();
    let mut trailers: Vec<String> = Vec::with_capacity(metadata.len() + 1);
    if let Some(id) = session_id {
        trailers.push(format!("{}: {}", SESSION_TRAILER, id));
    }
    trailers.extend(metadata.iter().map(|(k, v)| format!("{}: {}", k, v)));

    if trailers.is_empty() {
        format!("{}\n", body)
    } else {
        format!("{}\n\n{}\n", body, trailers.join("\n"))
    }
}

/// Split a raw commit message into text and trailers.
pub fn parse(raw: &str) -> ParsedMessage {
    let text = raw.trim_end();

    let Some(split) = text.rfind("\n\n") else {
        return ParsedMessage {
            message: text.to_string(),
            ..Default::default()
        };
    };

    let block = &text[split + 2..];
    let mut pairs = Vec::new();
    for line in block.lines() {
        match line.split_once(':') {
            Some((key, value)) if is_trailer_key(key) => {
                pairs.push((key.to_string(), value.trim().to_string()));
            }
            _ => {
                return ParsedMessage {
                    message: text.to_string(),
                    ..Default::default()
                }
            }
        }
    }

    let mut parsed = ParsedMessage {
        message: text[..split].trim_end().to_string(),
        ..Default::default()
    };
    for (key, value) in pairs {
        if key.eq_ignore_ascii_case(SESSION_TRAILER) {
            parsed.session_id = Some(value);
        } else {
            parsed.metadata.insert(key, value);
        }
    }
    parsed
}
