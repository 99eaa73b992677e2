// src/commands/status.rs

use super::open_workspace;
use anyhow::{Context, Result};
use keel::{AvailabilitySource, ArtifactStore, IndexFile, InstalledProbe, Manifest, ManifestProbe, MirrorRemote};
use std::path::Path;

/// Show every materialized package and whether the resolver may move it
pub fn cmd_status(root: &Path) -> Result<()> {
    let ws = open_workspace(root)?;
    let index = IndexFile::load(ws.index_path()).context("Failed to load availability index")?;
    let avail = index.available()?;
    let store = ArtifactStore::new(ws.objects_dir())?;
    let remote = MirrorRemote::new(ws.mirror_path(), ws.manifest_path(), store);
    let manifest = Manifest::load(ws.manifest_path())?;

    let platform = ws.settings().platform.as_ref();
    let state = ManifestProbe::new(&ws, &remote).probe(&avail, platform)?;

    if state.have().is_empty() && state.provided.is_empty() && state.unrecognized.is_empty() {
        println!("No packages materialized");
        return Ok(());
    }

    for (package, version) in &state.fixed {
        let reason = if platform.is_some_and(|pin| pin.name == *package) {
            "platform"
        } else if manifest.get(package).is_some_and(|e| e.held) {
            "held"
        } else {
            "modified"
        };
        println!("  {} {} (fixed: {})", package, version, reason);
    }
    for (package, version) in &state.free {
        println!("  {} {}", package, version);
    }
    for (package, version) in &state.provided {
        println!("  {} {} (provided by the platform)", package, version);
    }

    if !state.unrecognized.is_empty() {
        let names: Vec<_> = state.unrecognized.iter().map(String::as_str).collect();
        println!("Not recognized: {}", names.join(", "));
    }
    Ok(())
}
