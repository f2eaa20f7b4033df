//! cli
//!
//! Command-line interface layer for branchfs.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Build the [`Provider`] and acting session once per invocation
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and dispatches to
//! the [`Provider`]; all repository state changes flow through the
//! mutation engine behind it.

pub mod args;
pub mod commands;

pub use args::{Cli, Command, Shell};

use anyhow::{Context as _, Result};

use crate::core::config::Config;
use crate::core::types::SessionInfo;
use crate::provider::Provider;
use crate::ui::output::Verbosity;
use crate::ui::logging;

/// User recorded when neither `--user` nor the environment names one.
const FALLBACK_USER: &str = "bfs";

/// Everything a command handler needs.
#[derive(Debug)]
pub struct Context {
    pub provider: Provider,
    pub session: SessionInfo,
    pub verbosity: Verbosity,
    pub json: bool,
}

impl Context {
    /// Build the context from parsed global flags.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let mut config =
            Config::load(cli.config.as_deref()).context("failed to load configuration")?;
        if let Some(root) = &cli.root {
            config = config.with_root(root);
        }
        let provider = Provider::new(config).context("invalid configuration")?;

        Ok(Self {
            provider,
            session: session_from(cli)?,
            verbosity: Verbosity::from_flags(cli.quiet, cli.debug),
            json: cli.json,
        })
    }
}

fn session_from(cli: &Cli) -> Result<SessionInfo> {
    let user = cli
        .user
        .clone()
        .or_else(|| std::env::var("USER").ok())
        .or_else(|| std::env::var("USERNAME").ok())
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_USER.to_string());

    let mut session = SessionInfo::new(user).context("invalid --user")?;
    if let Some(id) = &cli.session {
        session = session.with_id(id).context("invalid --session")?;
    }
    if let Some(email) = &cli.email {
        session = session.with_email(email).context("invalid --email")?;
    }
    Ok(session)
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    logging::init(Verbosity::from_flags(cli.quiet, cli.debug));

    // Completion needs neither configuration nor a registry.
    if let Command::Completion { shell } = cli.command {
        return commands::completion::completion(shell);
    }

    let ctx = Context::from_cli(&cli)?;
    commands::dispatch(cli.command, &ctx)
}
