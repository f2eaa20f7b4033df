//! cli::commands
//!
//! Command handlers. Each handler resolves its addresses through the
//! [`Provider`](crate::provider::Provider) held by the [`Context`] and
//! renders the outcome with [`crate::ui::output`].
//!
//! # Modules
//!
//! - [`admin`] - `init`, `branch`
//! - [`read`] - `ls`, `cat`, `stat`, `log`, `path`
//! - [`mutate`] - `write`, `mv`, `rm`, `cp`
//! - [`completion`] - Shell completion scripts

pub mod admin;
pub mod completion;
pub mod mutate;
pub mod read;

use anyhow::Result;

use super::args::Command;
use super::Context;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Init { repo } => admin::init(ctx, &repo),
        Command::Branch {
            repo,
            name,
            from,
            message,
        } => match name {
            Some(name) => admin::create_branch(ctx, &repo, &name, from.as_deref(), message),
            None => admin::list_branches(ctx, &repo),
        },

        Command::Ls { uri } => read::ls(ctx, &uri),
        Command::Cat { uri } => read::cat(ctx, &uri),
        Command::Stat { uri } => read::stat(ctx, &uri),
        Command::Log { uri } => read::log(ctx, &uri),
        Command::Path { uri } => read::path(ctx, &uri),

        Command::Write {
            uri,
            content,
            file,
            expect,
            message,
        } => mutate::write(ctx, &uri, content, file, expect, message),
        Command::Mv {
            uri,
            new_name,
            content,
            meta,
            expect,
            message,
        } => mutate::mv(ctx, &uri, &new_name, content, &meta, expect, message),
        Command::Rm {
            uri,
            expect,
            message,
        } => mutate::rm(ctx, &uri, expect, message),
        Command::Cp { uri, dest, message } => mutate::cp(ctx, &uri, &dest, message),

        Command::Completion { shell } => completion::completion(shell),
    }
}
