// src/commands/require.rs
//! Adding and removing requirements
//!
//! Both commands compare the parsed requirement sets before and after the
//! edit; an edit that changes nothing (e.g. re-adding the same constraint)
//! neither rewrites `keel.toml` nor syncs. The new requirements are only
//! written once the sync they trigger has succeeded.

use super::{load_requirements, open_workspace, print_outcome};
use anyhow::{Context, Result};
use keel::{
    reconcile_workspace, requirements_changed, AvailabilitySource, IndexFile, RequirementSource, RunOptions,
    VersionSet,
};
use std::path::Path;
use tracing::info;

/// Require `package` (optionally constrained) and sync
pub fn cmd_add(root: &Path, package: &str, constraint: Option<&str>, dry_run: bool) -> Result<()> {
    let ws = open_workspace(root)?;
    let (text, source, before) = load_requirements(&ws)?;

    let index = IndexFile::load(ws.index_path()).context("Failed to load availability index")?;
    let avail = index.available()?;
    if !avail.contains_package(package) && !before.contains_key(package) {
        return Err(keel::Error::UnknownPackage(package.to_string()).into());
    }

    let set = match constraint {
        Some(c) => VersionSet::parse(c).with_context(|| format!("Invalid constraint for {}", package))?,
        None => VersionSet::any(),
    };

    let mut after = before.clone();
    after.insert(package.to_string(), set);
    let new_text = source.write(&after)?;

    if !requirements_changed(&source, &text, &new_text)? {
        println!("{} is already required as {}", package, after[package]);
        return Ok(());
    }

    info!("Requiring {} {}", package, after[package]);
    let outcome = reconcile_workspace(&ws, &after, RunOptions { dry_run })?;
    print_outcome(&outcome);

    if !dry_run {
        ws.write_config_text(&new_text)?;
    }
    Ok(())
}

/// Stop requiring `package` and sync
pub fn cmd_remove(root: &Path, package: &str, dry_run: bool) -> Result<()> {
    let ws = open_workspace(root)?;
    let (text, source, before) = load_requirements(&ws)?;

    let mut after = before.clone();
    after.remove(package);
    let new_text = source.write(&after)?;

    if !requirements_changed(&source, &text, &new_text)? {
        println!("{} is not required", package);
        return Ok(());
    }

    info!("No longer requiring {}", package);
    let outcome = reconcile_workspace(&ws, &after, RunOptions { dry_run })?;
    print_outcome(&outcome);

    if !dry_run {
        ws.write_config_text(&new_text)?;
    }
    Ok(())
}
