// src/index/mod.rs

//! Availability index: which versions of which packages exist
//!
//! The index maps every package to its known versions, and every version to
//! an [`ArtifactDescriptor`] carrying its dependency edges and the content
//! hash of the exact tree. It is produced by an [`AvailabilitySource`] and is
//! read-only to the rest of keel.

mod file;

pub use file::IndexFile;

use crate::error::Result;
use crate::hash::Hash;
use crate::version::{Version, VersionSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything the index knows about one version of a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    /// Content hash identifying the exact tree
    pub hash: Hash,

    /// Dependency package -> admissible versions
    #[serde(default)]
    pub dependencies: BTreeMap<String, VersionSet>,
}

impl ArtifactDescriptor {
    pub fn new(hash: Hash) -> Self {
        Self {
            hash,
            dependencies: BTreeMap::new(),
        }
    }

    pub fn with_dependency(mut self, package: &str, constraint: VersionSet) -> Self {
        self.dependencies.insert(package.to_string(), constraint);
        self
    }
}

/// Package -> (Version -> ArtifactDescriptor)
///
/// Ordered maps keep every iteration deterministic, which the resolver's
/// tie-breaking relies on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailabilityIndex {
    packages: BTreeMap<String, BTreeMap<Version, ArtifactDescriptor>>,
}

impl AvailabilityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a version (replacing any previous descriptor for it)
    pub fn insert(&mut self, package: &str, version: Version, descriptor: ArtifactDescriptor) {
        self.packages
            .entry(package.to_string())
            .or_default()
            .insert(version, descriptor);
    }

    pub fn contains_package(&self, package: &str) -> bool {
        self.packages.contains_key(package)
    }

    /// All versions of a package, ascending
    pub fn versions(&self, package: &str) -> Option<&BTreeMap<Version, ArtifactDescriptor>> {
        self.packages.get(package)
    }

    pub fn get(&self, package: &str, version: &Version) -> Option<&ArtifactDescriptor> {
        self.packages.get(package).and_then(|v| v.get(version))
    }

    pub fn hash_of(&self, package: &str, version: &Version) -> Option<&Hash> {
        self.get(package, version).map(|d| &d.hash)
    }

    /// Find the version of `package` whose tree is `hash`
    pub fn version_for_hash(&self, package: &str, hash: &Hash) -> Option<&Version> {
        self.packages
            .get(package)?
            .iter()
            .find(|(_, d)| &d.hash == hash)
            .map(|(v, _)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeMap<Version, ArtifactDescriptor>)> {
        self.packages.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Keep only the versions for which `keep` returns true
    ///
    /// Packages left with no versions stay in the index with an empty
    /// version map, so "known but unsatisfiable" remains distinguishable from
    /// "unknown".
    pub fn retain_versions<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str, &Version, &ArtifactDescriptor) -> bool,
    {
        for (name, versions) in self.packages.iter_mut() {
            versions.retain(|v, d| keep(name, v, d));
        }
    }

    /// Total number of (package, version) pairs
    pub fn len(&self) -> usize {
        self.packages.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Provider of availability data (external collaborator)
pub trait AvailabilitySource {
    /// Snapshot of everything currently available
    fn available(&self) -> Result<AvailabilityIndex>;

    /// Where artifacts of `package` are fetched from
    fn url(&self, package: &str) -> Option<String>;

    /// Content hash of a specific version
    fn sha1(&self, package: &str, version: &Version) -> Option<Hash>;
}

/// An in-memory index is its own source; artifacts are fetched by package name
impl AvailabilitySource for AvailabilityIndex {
    fn available(&self) -> Result<AvailabilityIndex> {
        Ok(self.clone())
    }

    fn url(&self, package: &str) -> Option<String> {
        self.contains_package(package).then(|| package.to_string())
    }

    fn sha1(&self, package: &str, version: &Version) -> Option<Hash> {
        self.hash_of(package, version).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(seed: u8) -> Hash {
        Hash::parse(&format!("{:02x}", seed).repeat(20)).unwrap()
    }

    #[test]
    fn test_version_for_hash() {
        let mut index = AvailabilityIndex::new();
        index.insert("a", Version::new(1, 0, 0), ArtifactDescriptor::new(hash(1)));
        index.insert("a", Version::new(2, 0, 0), ArtifactDescriptor::new(hash(2)));

        assert_eq!(index.version_for_hash("a", &hash(2)), Some(&Version::new(2, 0, 0)));
        assert_eq!(index.version_for_hash("a", &hash(3)), None);
        assert_eq!(index.version_for_hash("b", &hash(1)), None);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_retain_keeps_package_entry() {
        let mut index = AvailabilityIndex::new();
        index.insert("a", Version::new(1, 0, 0), ArtifactDescriptor::new(hash(1)));
        index.retain_versions(|_, _, _| false);

        assert!(index.contains_package("a"));
        assert!(index.versions("a").unwrap().is_empty());
        assert!(index.is_empty());
    }
}
