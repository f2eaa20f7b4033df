//! Read-only commands: ls, cat, stat, log, path

use anyhow::Result;
use serde::Serialize;

use crate::cli::Context;
use crate::ui::output;

#[derive(Debug, Serialize)]
struct ListingEntry {
    name: String,
    uri: String,
}

/// List the children of a directory.
pub fn ls(ctx: &Context, uri: &str) -> Result<()> {
    let listing = ctx.provider.list(uri)?;
    let commit = listing.commit().clone();
    let entries: Vec<ListingEntry> = listing
        .map(|path| ListingEntry {
            name: path.name().unwrap_or_default().to_string(),
            uri: ctx.provider.to_uri(&path),
        })
        .collect();

    if ctx.json {
        return output::json(&serde_json::json!({
            "commit": commit,
            "entries": entries,
        }));
    }

    output::debug(format!("snapshot {}", commit), ctx.verbosity);
    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    if !names.is_empty() {
        println!("{}", output::format_list(&names, ""));
    }
    Ok(())
}

/// Print file content. Raw bytes unless `--json`.
pub fn cat(ctx: &Context, uri: &str) -> Result<()> {
    let content = ctx.provider.read_all(uri)?;
    if ctx.json {
        return output::json(&serde_json::json!({
            "uri": uri,
            "size": content.len(),
            "content": String::from_utf8_lossy(&content),
        }));
    }
    output::raw(&content)?;
    Ok(())
}

pub fn stat(ctx: &Context, uri: &str) -> Result<()> {
    let stat = ctx.provider.stat(uri)?;
    if ctx.json {
        return output::json(&stat);
    }
    println!("{}", output::format_stat(&stat));
    Ok(())
}

/// Versions of an entry, oldest first.
pub fn log(ctx: &Context, uri: &str) -> Result<()> {
    let history = ctx.provider.history(uri)?;
    if ctx.json {
        return output::json(&history);
    }
    for version in &history {
        println!("{}", output::format_version(version));
    }
    Ok(())
}

/// Print the rendered path string.
pub fn path(ctx: &Context, uri: &str) -> Result<()> {
    let rendered = ctx.provider.build_path_from(uri)?;
    if ctx.json {
        return output::json(&serde_json::json!({ "uri": uri, "path": rendered }));
    }
    println!("{}", rendered);
    Ok(())
}
