//! Mutating commands: write, mv, rm, cp
//!
//! Each invocation is exactly one commit. `--expect` pins the branch tip
//! the change was prepared against; a moved tip fails the command instead
//! of overwriting someone else's work.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};

use crate::cli::Context;
use crate::core::resolver::LogicalPath;
use crate::core::types::{Oid, VersionRecord};
use crate::engine::CommitRequest;
use crate::ui::output;

fn request(ctx: &Context, message: String, expect: Option<String>) -> Result<CommitRequest> {
    let mut request = CommitRequest::new(message, ctx.session.clone());
    if let Some(expect) = expect {
        let base = Oid::new(expect).context("invalid --expect commit id")?;
        request = request.expecting(base);
    }
    Ok(request)
}

/// Parse repeated `KEY=VALUE` arguments.
fn parse_metadata(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    let mut metadata = BTreeMap::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("invalid --meta '{}': expected KEY=VALUE", pair);
        };
        metadata.insert(key.to_string(), value.to_string());
    }
    Ok(metadata)
}

fn report(ctx: &Context, path: &LogicalPath, version: &VersionRecord) -> Result<()> {
    let uri = ctx.provider.to_uri(path);
    if ctx.json {
        return output::json(&serde_json::json!({
            "uri": uri,
            "version": version,
        }));
    }
    output::print(
        format!("{} {}", version.commit.short(8), uri),
        ctx.verbosity,
    );
    Ok(())
}

/// Write a file from `--file`, the inline argument, or stdin.
pub fn write(
    ctx: &Context,
    uri: &str,
    content: Option<String>,
    file: Option<PathBuf>,
    expect: Option<String>,
    message: Option<String>,
) -> Result<()> {
    let bytes = match (content, file) {
        (Some(content), _) => content.into_bytes(),
        (None, Some(file)) => std::fs::read(&file)
            .with_context(|| format!("failed to read {}", file.display()))?,
        (None, None) => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("failed to read content from stdin")?;
            buf
        }
    };

    let path = ctx.provider.resolve(uri)?.path;
    let message = message.unwrap_or_else(|| format!("Write {}", path.relative_path()));
    let request = request(ctx, message, expect)?;

    let version = ctx.provider.write(uri, &bytes, &request)?;
    report(ctx, &path, &version)
}

/// Rename, or save-and-rename when `--content` is given.
pub fn mv(
    ctx: &Context,
    uri: &str,
    new_name: &str,
    content: Option<PathBuf>,
    meta: &[String],
    expect: Option<String>,
    message: Option<String>,
) -> Result<()> {
    let path = ctx.provider.resolve(uri)?.path;
    let message = message.unwrap_or_else(|| {
        format!(
            "Rename {} to {}",
            path.name().unwrap_or_default(),
            new_name
        )
    });
    let request = request(ctx, message, expect)?;

    let (renamed, version) = match content {
        Some(file) => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let metadata = parse_metadata(meta)?;
            ctx.provider
                .save_and_rename(uri, new_name, &metadata, &bytes, &request)?
        }
        None => ctx.provider.rename(uri, new_name, &request)?,
    };
    report(ctx, &renamed, &version)
}

pub fn rm(
    ctx: &Context,
    uri: &str,
    expect: Option<String>,
    message: Option<String>,
) -> Result<()> {
    let path = ctx.provider.resolve(uri)?.path;
    let message = message.unwrap_or_else(|| format!("Delete {}", path.relative_path()));
    let request = request(ctx, message, expect)?;

    let version = ctx.provider.delete(uri, &request)?;
    report(ctx, &path, &version)
}

pub fn cp(ctx: &Context, uri: &str, dest: &str, message: Option<String>) -> Result<()> {
    let source = ctx.provider.resolve(uri)?.path;
    let target = ctx.provider.resolve(dest)?.path;
    let message = message.unwrap_or_else(|| {
        format!(
            "Copy {} to {}",
            source.relative_path(),
            target.relative_path()
        )
    });
    let request = request(ctx, message, None)?;

    let (copied, version) = ctx.provider.copy(uri, dest, &request)?;
    report(ctx, &copied, &version)
}
