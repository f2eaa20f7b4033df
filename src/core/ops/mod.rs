//! core::ops
//!
//! Mutation-time coordination.
//!
//! # Modules
//!
//! - [`lock`] - Exclusive per-branch lock
//!
//! # Architecture
//!
//! Every mutation:
//! 1. Acquires the branch lock (bounded wait)
//! 2. Reads the branch tip
//! 3. Builds the new tree and commit
//! 4. Advances the ref with compare-and-swap
//! 5. Releases the lock

pub mod lock;

pub use lock::{BranchLock, LockError};
