//! core
//!
//! Pure building blocks shared by every layer: strong types, addressing,
//! naming rules, commit message layout, configuration, storage paths and
//! the per-branch lock.

pub mod config;
pub mod message;
pub mod naming;
pub mod ops;
pub mod paths;
pub mod resolver;
pub mod types;
