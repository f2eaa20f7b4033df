//! branchfs - A Git-backed virtual filesystem provider
//!
//! branchfs exposes hierarchical paths and files stored in Git
//! repositories. Branches are mountable root directories, every mutation
//! is exactly one commit, and every version stays in history.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`core`] - Strong types, addressing, naming, config, locking
//! - [`git`] - Single interface for all Git operations
//! - [`registry`] - Repository name → open handle
//! - [`vfs`] - Read-only, snapshot-isolated branch views
//! - [`engine`] - Mutations as single commits, serialized per branch
//! - [`observe`] - Rename-stable path handles
//! - [`provider`] - URI-driven facade
//! - [`cli`] / [`ui`] - The `bfs` command-line front end
//!
//! # Addressing
//!
//! `<scheme>://<branch>@<repo>/<path...>`; the rendered path form is
//! `<branch>@/<path...>`.
//!
//! # Correctness Invariants
//!
//! 1. A branch ref only moves by compare-and-swap from the tip it was read at
//! 2. Mutations on one branch are serialized; history stays linear
//! 3. Readers see whole commits only
//! 4. Validation failures never write to the repository

pub mod cli;
pub mod core;
pub mod engine;
pub mod error;
pub mod git;
pub mod observe;
pub mod provider;
pub mod registry;
pub mod ui;
pub mod vfs;

pub use error::{ErrorKind, FsError};
pub use provider::Provider;
