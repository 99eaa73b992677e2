// src/commands/sync.rs
//! Sync and index refresh

use super::{load_requirements, open_workspace, print_outcome};
use anyhow::{Context, Result};
use keel::{reconcile_workspace, IndexFile, RunOptions};
use std::path::{Path, PathBuf};
use tracing::info;

/// Resolve the declared requirements and apply the result
pub fn cmd_sync(root: &Path, dry_run: bool) -> Result<()> {
    let ws = open_workspace(root)?;
    let (_, _, reqs) = load_requirements(&ws)?;

    let outcome = reconcile_workspace(&ws, &reqs, RunOptions { dry_run })?;
    print_outcome(&outcome);
    Ok(())
}

/// Refresh the index from `from` (or the configured source), then sync
///
/// The refreshed index is kept even on a dry run; only the sync is simulated.
pub fn cmd_update(root: &Path, from: Option<PathBuf>, dry_run: bool) -> Result<()> {
    let ws = open_workspace(root)?;

    let source = match from.or_else(|| ws.index_source()) {
        Some(source) => source,
        None => anyhow::bail!("No index source given and settings.index_source is not set"),
    };

    let mut index = IndexFile::load(ws.index_path()).context("Failed to load availability index")?;
    let versions = index
        .update_from(&source)
        .with_context(|| format!("Failed to refresh index from {}", source.display()))?;
    info!("Index now lists {} versions", versions);
    println!("Refreshed index from {} ({} versions)", source.display(), versions);

    let (_, _, reqs) = load_requirements(&ws)?;
    let outcome = reconcile_workspace(&ws, &reqs, RunOptions { dry_run })?;
    print_outcome(&outcome);
    Ok(())
}
