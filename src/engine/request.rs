//! engine::request
//!
//! What a caller supplies with every mutation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::core::types::{Oid, SessionInfo};

/// Cooperative cancellation flag, shared between clones.
///
/// The engine checks it while waiting for the branch lock and once more
/// right before publishing the commit. After the ref update has started
/// the call runs to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Attribution and preconditions for one mutation.
///
/// # Example
///
/// ```
/// use branchfs::core::types::SessionInfo;
/// use branchfs::engine::{CancelToken, CommitRequest};
///
/// let session = SessionInfo::new("alice").unwrap();
/// let token = CancelToken::new();
/// let request = CommitRequest::new("Update readme", session).with_cancel(token.clone());
/// assert!(!request.is_cancelled());
/// token.cancel();
/// assert!(request.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CommitRequest {
    message: String,
    session: SessionInfo,
    expected_base: Option<Oid>,
    cancel: Option<CancelToken>,
}

impl CommitRequest {
    pub fn new(message: impl Into<String>, session: SessionInfo) -> Self {
        Self {
            message: message.into(),
            session,
            expected_base: None,
            cancel: None,
        }
    }

    /// Require the branch tip to still be `base` when the change is applied.
    pub fn expecting(mut self, base: Oid) -> Self {
        self.expected_base = Some(base);
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn session(&self) -> &SessionInfo {
        &self.session
    }

    pub fn expected_base(&self) -> Option<&Oid> {
        self.expected_base.as_ref()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }
}
