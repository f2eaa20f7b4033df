//! ui
//!
//! Terminal output for the `bfs` binary.
//!
//! # Modules
//!
//! - [`output`] - Verbosity-aware printing and JSON rendering
//! - [`logging`] - Tracing subscriber setup
//!
//! The library never prints; everything a user sees goes through here.

pub mod logging;
pub mod output;
