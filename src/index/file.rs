// src/index/file.rs

//! JSON-file backed availability source
//!
//! ```json
//! {
//!   "json-tools": {
//!     "url": "mirror/json-tools",
//!     "versions": {
//!       "1.2.0": {
//!         "hash": "5f1c0a3e9d7b2c4a8e6f0b1d3c5a7e9f2b4d6c8a",
//!         "dependencies": { "text-core": ">= 2.0.0, < 3.0.0" }
//!       }
//!     }
//!   }
//! }
//! ```

use super::{ArtifactDescriptor, AvailabilityIndex, AvailabilitySource};
use crate::error::{Error, Result};
use crate::filesystem::validate_package_name;
use crate::hash::Hash;
use crate::version::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One package entry in the index file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PackageEntry {
    /// Source location of the package's artifacts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,

    #[serde(default)]
    versions: BTreeMap<Version, ArtifactDescriptor>,
}

/// Availability index loaded from a JSON file
#[derive(Debug, Clone)]
pub struct IndexFile {
    path: PathBuf,
    entries: BTreeMap<String, PackageEntry>,
}

impl IndexFile {
    /// Load an index file. A missing file is an empty index.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let text = fs::read_to_string(&path)?;
            parse_entries(&text)?
        } else {
            debug!("No index at {}, starting empty", path.display());
            BTreeMap::new()
        };
        Ok(Self { path, entries })
    }

    /// Replace the index with the contents of `source` and persist it
    ///
    /// The source is fully parsed before anything is written, so a broken
    /// source leaves the current index untouched.
    pub fn update_from<P: AsRef<Path>>(&mut self, source: P) -> Result<usize> {
        let source = source.as_ref();
        let text = fs::read_to_string(source).map_err(|e| {
            Error::Config(format!("cannot read index source {}: {}", source.display(), e))
        })?;
        self.entries = parse_entries(&text)?;
        self.save()?;

        let count = self.entries.values().map(|e| e.versions.len()).sum();
        info!("Index updated from {} ({} versions)", source.display(), count);
        Ok(count)
    }

    /// Write the index back to its file (temp file + rename)
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp = self.path.with_extension("json.tmp");
        fs::write(&temp, serde_json::to_string_pretty(&self.entries)?)?;
        fs::rename(&temp, &self.path)?;
        Ok(())
    }

    /// Register a version in memory (call [`IndexFile::save`] to persist)
    pub fn insert(&mut self, package: &str, url: Option<&str>, version: Version, descriptor: ArtifactDescriptor) {
        let entry = self.entries.entry(package.to_string()).or_default();
        if let Some(url) = url {
            entry.url = Some(url.to_string());
        }
        entry.versions.insert(version, descriptor);
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Parse index JSON, rejecting package names that are not plain path components
fn parse_entries(text: &str) -> Result<BTreeMap<String, PackageEntry>> {
    let entries: BTreeMap<String, PackageEntry> = serde_json::from_str(text)?;
    for (name, entry) in &entries {
        validate_package_name(name)?;
        for descriptor in entry.versions.values() {
            for dep in descriptor.dependencies.keys() {
                validate_package_name(dep)?;
            }
        }
    }
    Ok(entries)
}

impl AvailabilitySource for IndexFile {
    fn available(&self) -> Result<AvailabilityIndex> {
        let mut index = AvailabilityIndex::new();
        for (name, entry) in &self.entries {
            for (version, descriptor) in &entry.versions {
                index.insert(name, version.clone(), descriptor.clone());
            }
        }
        Ok(index)
    }

    fn url(&self, package: &str) -> Option<String> {
        let entry = self.entries.get(package)?;
        Some(entry.url.clone().unwrap_or_else(|| package.to_string()))
    }

    fn sha1(&self, package: &str, version: &Version) -> Option<Hash> {
        self.entries
            .get(package)?
            .versions
            .get(version)
            .map(|d| d.hash.clone())
    }
}
