//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Output is formatted consistently and respects the quiet flag.
//! When `--json` is enabled, output is machine-readable JSON.

use std::fmt::Display;
use std::io::Write;

use serde::Serialize;

use crate::core::types::VersionRecord;
use crate::vfs::EntryStat;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print a debug message (only in debug mode).
pub fn debug(message: impl Display, verbosity: Verbosity) {
    if verbosity == Verbosity::Debug {
        eprintln!("[debug] {}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a value as pretty JSON on stdout (always shown).
pub fn json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{}", rendered);
    Ok(())
}

/// Write raw bytes to stdout (always shown).
pub fn raw(content: &[u8]) -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(content)?;
    stdout.flush()
}

/// One-line summary of a version: short id, author, message.
pub fn format_version(version: &VersionRecord) -> String {
    let mut line = format!(
        "{} {} {} {}",
        version.commit.short(8),
        version.timestamp.format("%Y-%m-%d %H:%M:%S"),
        version.author,
        version.message.lines().next().unwrap_or_default()
    );
    for (key, value) in &version.metadata {
        line.push_str(&format!(" [{}={}]", key, value));
    }
    line
}

/// Human-readable stat block.
pub fn format_stat(stat: &EntryStat) -> String {
    let kind = if stat.is_directory { "directory" } else { "file" };
    let mut lines = vec![format!("type: {}", kind)];
    if !stat.is_directory {
        lines.push(format!("size: {}", stat.size));
    }
    if let Some(commit) = &stat.last_modifying_commit {
        lines.push(format!("last change: {}", commit));
    }
    lines.join("\n")
}

/// Format a list of items.
pub fn format_list<T: Display>(items: &[T], prefix: &str) -> String {
    items
        .iter()
        .map(|item| format!("{}{}", prefix, item))
        .collect::<Vec<_>>()
        .join("\n")
}
