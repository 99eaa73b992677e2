// src/commands/init.rs
//! Workspace initialization

use anyhow::{Context, Result};
use keel::workspace::{CONFIG_FILE, STATE_DIR};
use keel::Settings;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Serialize)]
struct NewConfig {
    settings: Settings,
    requires: BTreeMap<String, String>,
}

/// Create `keel.toml` and `.keel/` in `root`
pub fn cmd_init(root: &Path, index: Option<PathBuf>, mirror: Option<PathBuf>) -> Result<()> {
    let config_path = root.join(CONFIG_FILE);
    if config_path.exists() {
        anyhow::bail!("{} already exists", config_path.display());
    }

    let mut settings = Settings::default();
    if let Some(index) = index {
        settings.index = index;
    }
    if let Some(mirror) = mirror {
        settings.mirror = mirror;
    }

    let config = NewConfig {
        settings,
        requires: BTreeMap::new(),
    };
    let text = toml::to_string(&config).context("Failed to render configuration")?;

    fs::create_dir_all(root.join(STATE_DIR))
        .with_context(|| format!("Failed to create {}", root.join(STATE_DIR).display()))?;
    fs::write(&config_path, text)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    info!("Initialized keel workspace in {}", root.display());
    println!("Created {}", config_path.display());
    Ok(())
}
