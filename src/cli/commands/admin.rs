//! Repository and branch commands: init, branch

use anyhow::{Context as _, Result};

use crate::cli::Context;
use crate::core::types::{BranchName, RepoName};
use crate::engine::CommitRequest;
use crate::ui::output;

/// Create a repository with its default branch.
pub fn init(ctx: &Context, repo: &str) -> Result<()> {
    let repo = RepoName::new(repo).context("invalid repository name")?;
    let fs = ctx.provider.create_repository(&repo, ctx.session.clone())?;
    let tip = fs.tip()?;

    if ctx.json {
        return output::json(&serde_json::json!({
            "repo": repo,
            "branch": fs.branch(),
            "commit": tip,
        }));
    }
    output::print(
        format!("Initialized {} on branch {}", repo, fs.branch()),
        ctx.verbosity,
    );
    Ok(())
}

pub fn list_branches(ctx: &Context, repo: &str) -> Result<()> {
    let repo = RepoName::new(repo).context("invalid repository name")?;
    let branches = ctx.provider.branches(&repo)?;
    if ctx.json {
        return output::json(&branches);
    }
    if !branches.is_empty() {
        println!("{}", output::format_list(&branches, ""));
    }
    Ok(())
}

/// Create a branch, empty or from another branch's tip.
pub fn create_branch(
    ctx: &Context,
    repo: &str,
    name: &str,
    from: Option<&str>,
    message: Option<String>,
) -> Result<()> {
    let repo = RepoName::new(repo).context("invalid repository name")?;
    let name = BranchName::new(name).context("invalid branch name")?;
    let from = from
        .map(BranchName::new)
        .transpose()
        .context("invalid --from branch")?;

    let message = message.unwrap_or_else(|| format!("Create branch {}", name));
    let request = CommitRequest::new(message, ctx.session.clone());
    let fs = ctx
        .provider
        .create_branch(&repo, &name, from.as_ref(), &request)?;
    let tip = fs.tip()?;

    if ctx.json {
        return output::json(&serde_json::json!({
            "repo": repo,
            "branch": fs.branch(),
            "commit": tip,
        }));
    }
    output::print(
        format!("Created branch {} at {}", fs.branch(), tip.short(8)),
        ctx.verbosity,
    );
    Ok(())
}
