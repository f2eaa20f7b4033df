//! engine
//!
//! Versioned mutations: every change to a branch is exactly one commit.
//!
//! # Architecture
//!
//! The [`MutationEngine`] is the only writer of branch refs. Each operation
//! (write, rename, save-and-rename, delete, copy, branch creation) follows
//! one protocol:
//!
//! 1. **Validate**: names, metadata and path ownership, before any I/O
//! 2. **Lock**: take the per-branch lock, bounded by the lock timeout
//! 3. **Build**: read the tip, check the expected base, compute tree edits
//! 4. **Commit**: write the tree and a commit object parented on the tip
//! 5. **Publish**: compare-and-swap the branch ref from the tip to the commit
//!
//! # Invariants
//!
//! - Per-branch mutations are totally ordered; history stays linear
//! - Failed calls leave the branch ref untouched
//! - Cancellation is honored up to the ref update, never after it starts
//! - Each call emits `Started` and exactly one terminal [`MutationEvent`]
//!
//! # Example
//!
//! ```ignore
//! use branchfs::engine::{CommitRequest, MutationEngine};
//!
//! let engine = MutationEngine::default();
//! let request = CommitRequest::new("Add readme", session);
//! let readme = fs.path("docs/readme.txt")?;
//! engine.write(&fs, &readme, b"hello", &request)?;
//! let (renamed, version) = engine.rename(&fs, &readme, "readme2.txt", &request)?;
//! ```

mod events;
mod mutation;
mod request;

pub use events::{ListenerId, MutationEvent, MutationListener, MutationOp};
pub use mutation::{EngineSettings, MutationEngine};
pub use request::{CancelToken, CommitRequest};
