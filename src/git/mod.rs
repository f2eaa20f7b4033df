//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the **ONLY doorway** to Git. All repository reads and
//! writes flow through this interface. No other module imports `git2`.
//!
//! # Responsibilities
//!
//! - Repository opening and bare initialization
//! - Ref operations (resolve, CAS create/update)
//! - Object operations (blobs, trees, tree edits, commits)
//! - First-parent history walks
//!
//! # Invariants
//!
//! - All ref updates use CAS (compare-and-swap) semantics
//! - Commits are created detached; only CAS moves refs
//! - All operations return strong types (Oid, BranchName, RefName)

mod interface;

pub use interface::{
    CommitAuthor, CommitInfo, EntryKind, Git, GitError, TreeEdit, TreeEntry, FILE_MODE_BLOB,
    FILE_MODE_TREE,
};
