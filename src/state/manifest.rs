// src/state/manifest.rs

//! Installed manifest (`.keel/state.json`)
//!
//! Records, for every materialized package, the artifact hash it was
//! materialized from and the tree digest at that moment.

use crate::error::Result;
use crate::hash::Hash;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Manifest record for one materialized package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Artifact the working copy was materialized from
    pub hash: Hash,

    /// Tree digest right after materialization
    pub digest: String,

    /// Held by the user: the resolver must not move it
    #[serde(default)]
    pub held: bool,
}

/// The manifest file, loaded into memory
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    entries: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    /// Load the manifest. A missing file is an empty manifest.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            serde_json::from_str(&fs::read_to_string(&path)?)?
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, entries })
    }

    /// Persist the manifest (temp file + rename)
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp = self.path.with_extension("json.tmp");
        fs::write(&temp, serde_json::to_string_pretty(&self.entries)?)?;
        fs::rename(&temp, &self.path)?;
        Ok(())
    }

    pub fn get(&self, package: &str) -> Option<&ManifestEntry> {
        self.entries.get(package)
    }

    /// Record a package, keeping a previous `held` flag
    pub fn record(&mut self, package: &str, hash: Hash, digest: String) {
        let held = self.entries.get(package).is_some_and(|e| e.held);
        self.entries
            .insert(package.to_string(), ManifestEntry { hash, digest, held });
    }

    pub fn forget(&mut self, package: &str) -> Option<ManifestEntry> {
        self.entries.remove(package)
    }

    /// Set the held flag. Returns false if the package is not recorded.
    pub fn set_held(&mut self, package: &str, held: bool) -> bool {
        match self.entries.get_mut(package) {
            Some(entry) => {
                entry.held = held;
                true
            }
            None => false,
        }
    }

    pub fn packages(&self) -> impl Iterator<Item = (&str, &ManifestEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
