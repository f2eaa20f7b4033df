//! cli::args
//!
//! Command-line argument definitions using clap derive.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// bfs - Browse and edit Git-backed branch filesystems
#[derive(Parser, Debug)]
#[command(name = "bfs")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Registry root holding the repositories (overrides config)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Configuration file to load
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Acting user recorded as commit author
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// Session identifier recorded as a commit trailer
    #[arg(long, global = true)]
    pub session: Option<String>,

    /// Author e-mail (synthesized from the user when omitted)
    #[arg(long, global = true)]
    pub email: Option<String>,

    /// Machine-readable JSON output
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a repository with its default branch
    Init {
        /// Repository name
        repo: String,
    },

    /// Create a branch, or list branches when no name is given
    Branch {
        /// Repository name
        repo: String,

        /// New branch name
        name: Option<String>,

        /// Start from this branch's tip instead of an empty tree
        #[arg(long)]
        from: Option<String>,

        /// Commit message
        #[arg(short, long)]
        message: Option<String>,
    },

    /// List a directory
    Ls {
        /// Address, e.g. default://master@repo/docs
        uri: String,
    },

    /// Print file content
    Cat {
        uri: String,
    },

    /// Show entry metadata
    Stat {
        uri: String,
    },

    /// Show the versions of an entry, oldest first
    Log {
        uri: String,
    },

    /// Print the rendered path string (<branch>@/<path>)
    Path {
        uri: String,
    },

    /// Write a file (content from --file, the argument, or stdin)
    Write {
        uri: String,

        /// Inline content
        content: Option<String>,

        /// Read content from a file
        #[arg(long, conflicts_with = "content")]
        file: Option<PathBuf>,

        /// Fail unless the branch tip is this commit
        #[arg(long)]
        expect: Option<String>,

        /// Commit message
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Rename an entry within its directory
    Mv {
        uri: String,

        /// New final path segment
        new_name: String,

        /// Save this content together with the rename
        #[arg(long)]
        content: Option<PathBuf>,

        /// Metadata trailer (KEY=VALUE), repeatable
        #[arg(long = "meta", value_name = "KEY=VALUE", requires = "content")]
        meta: Vec<String>,

        /// Fail unless the branch tip is this commit
        #[arg(long)]
        expect: Option<String>,

        /// Commit message
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Delete a file or directory
    Rm {
        uri: String,

        /// Fail unless the branch tip is this commit
        #[arg(long)]
        expect: Option<String>,

        /// Commit message
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Copy an entry within one branch
    Cp {
        uri: String,

        /// Destination address on the same branch
        dest: String,

        /// Commit message
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Generate shell completion scripts
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Shells supported by `bfs completion`.
#[derive(ValueEnum, Clone, Copy, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["bfs", "cat", "default://master@r/a.txt", "--json"]).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Command::Cat { .. }));
    }

    #[test]
    fn meta_requires_content() {
        let result = Cli::try_parse_from([
            "bfs",
            "mv",
            "default://master@r/a.txt",
            "b.txt",
            "--meta",
            "K=v",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn file_conflicts_with_inline_content() {
        let result = Cli::try_parse_from([
            "bfs",
            "write",
            "default://master@r/a.txt",
            "inline",
            "--file",
            "x.txt",
        ]);
        assert!(result.is_err());
    }
}
