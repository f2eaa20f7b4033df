//! engine::events
//!
//! Outcome signals for UI layers.
//!
//! Every mutation call emits [`MutationEvent::Started`] and then exactly
//! one terminal event, [`MutationEvent::Succeeded`] or
//! [`MutationEvent::Failed`]. Listeners run synchronously on the calling
//! thread, in registration order.

use serde::Serialize;

use crate::core::resolver::LogicalPath;
use crate::core::types::VersionRecord;
use crate::error::ErrorKind;

/// Which mutation an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationOp {
    Write,
    Rename,
    SaveAndRename,
    Delete,
    Copy,
    CreateBranch,
}

impl std::fmt::Display for MutationOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MutationOp::Write => "write",
            MutationOp::Rename => "rename",
            MutationOp::SaveAndRename => "save_and_rename",
            MutationOp::Delete => "delete",
            MutationOp::Copy => "copy",
            MutationOp::CreateBranch => "create_branch",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub enum MutationEvent {
    Started {
        op: MutationOp,
        path: LogicalPath,
    },
    Succeeded {
        op: MutationOp,
        /// Where the entry lives after the change.
        path: LogicalPath,
        version: VersionRecord,
    },
    Failed {
        op: MutationOp,
        path: LogicalPath,
        kind: ErrorKind,
        message: String,
    },
}

impl MutationEvent {
    pub fn op(&self) -> MutationOp {
        match self {
            MutationEvent::Started { op, .. }
            | MutationEvent::Succeeded { op, .. }
            | MutationEvent::Failed { op, .. } => *op,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, MutationEvent::Started { .. })
    }
}

/// Receives mutation events.
pub trait MutationListener: Send + Sync {
    fn on_event(&self, event: &MutationEvent);
}

impl<F> MutationListener for F
where
    F: Fn(&MutationEvent) + Send + Sync,
{
    fn on_event(&self, event: &MutationEvent) {
        self(event)
    }
}

/// Handle returned by `MutationEngine::add_listener`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);
