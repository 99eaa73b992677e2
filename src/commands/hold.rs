// src/commands/hold.rs

use super::open_workspace;
use anyhow::Result;
use keel::{Manifest, WorkspaceLock};
use std::path::Path;
use tracing::info;

/// Set or clear the held flag of a materialized package
pub fn cmd_hold(root: &Path, package: &str, held: bool) -> Result<()> {
    let ws = open_workspace(root)?;
    let _lock = WorkspaceLock::acquire(&ws)?;

    let mut manifest = Manifest::load(ws.manifest_path())?;
    if !manifest.set_held(package, held) {
        anyhow::bail!("{} is not materialized in this workspace", package);
    }
    manifest.save()?;

    if held {
        info!("Holding {}", package);
        println!("{} will stay at its current version", package);
    } else {
        info!("Releasing {}", package);
        println!("{} may be moved by the resolver again", package);
    }
    Ok(())
}
