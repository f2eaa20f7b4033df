//! vfs::record
//!
//! Rebuilding [`VersionRecord`]s from commit objects.

use crate::core::message;
use crate::core::types::{SessionInfo, VersionRecord};
use crate::git::CommitInfo;

/// The version record carried by a commit.
pub(crate) fn version_record(info: &CommitInfo) -> VersionRecord {
    let parsed = message::parse(&info.message);
    let email = (!info.author_email.is_empty()).then(|| info.author_email.clone());

    VersionRecord {
        commit: info.oid.clone(),
        author: SessionInfo::from_commit(info.author_name.clone(), parsed.session_id, email),
        timestamp: info.author_time,
        message: parsed.message,
        metadata: parsed.metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Oid;
    use chrono::DateTime;

    #[test]
    fn trailers_become_session_and_metadata() {
        let info = CommitInfo {
            oid: Oid::new("a".repeat(40)).unwrap(),
            tree: Oid::new("b".repeat(40)).unwrap(),
            parents: vec![],
            message: "Save\n\nSession-Id: tab-1\nTicket: 7\n".to_string(),
            author_name: "alice".to_string(),
            author_email: "alice@branchfs.local".to_string(),
            author_time: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        };

        let record = version_record(&info);
        assert_eq!(record.message, "Save");
        assert_eq!(record.author.user(), "alice");
        assert_eq!(record.author.id(), Some("tab-1"));
        assert_eq!(record.author.email(), Some("alice@branchfs.local"));
        assert_eq!(record.metadata.get("Ticket").map(String::as_str), Some("7"));
        assert_eq!(record.timestamp.timestamp(), 1_700_000_000);
    }
}
