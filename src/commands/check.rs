// src/commands/check.rs

use super::open_workspace;
use anyhow::{Context, Result};
use keel::{AvailabilitySource, IndexFile, Resolver};
use std::path::Path;
use tracing::info;

/// Verify that every indexed version can be installed on its own
///
/// Problems are warnings about the index, not errors: they are reported,
/// then the process exits with status 1 so scripts can notice them.
pub fn cmd_check(root: &Path) -> Result<()> {
    let ws = open_workspace(root)?;
    let index = IndexFile::load(ws.index_path()).context("Failed to load availability index")?;
    let avail = index.available()?;

    info!("Checking {} packages in {}", avail.len(), index.path().display());
    let report = Resolver::new(&avail)
        .with_max_steps(ws.settings().max_resolver_steps)
        .sanity_check();

    for issue in &report.issues {
        println!("  {}", issue);
    }
    for (package, version) in &report.undecided {
        println!("  {} {} could not be checked within the step budget", package, version);
    }
    println!(
        "Checked {} versions: {} uninstallable, {} undecided",
        report.checked,
        report.issues.len(),
        report.undecided.len()
    );

    if !report.is_consistent() {
        println!("INCONSISTENT: {} versions in the index can never be installed", report.issues.len());
        std::process::exit(1);
    }
    Ok(())
}
