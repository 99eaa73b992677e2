// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use keel::{
    ArtifactDescriptor, ArtifactStorage, Assignment, AvailabilityIndex, Error, Hash, InstalledProbe,
    InstalledState, Materializer, Remote, RequirementSet, Result, Version, VersionSet, WorkingCopy, Workspace,
};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::Path;

pub fn v(s: &str) -> Version {
    Version::parse(s).unwrap()
}

/// Deterministic 40-char hash from a seed
pub fn h(seed: u8) -> Hash {
    Hash::parse(&format!("{:02x}", seed).repeat(20)).unwrap()
}

pub fn reqs(pairs: &[(&str, &str)]) -> RequirementSet {
    pairs
        .iter()
        .map(|(p, s)| (p.to_string(), VersionSet::parse(s).unwrap()))
        .collect()
}

pub fn assignment(pairs: &[(&str, &str)]) -> Assignment {
    pairs.iter().map(|(p, s)| (p.to_string(), v(s))).collect()
}

/// Build an index from (package, version, hash seed, dependencies)
pub fn index(entries: &[(&str, &str, u8, &[(&str, &str)])]) -> AvailabilityIndex {
    let mut avail = AvailabilityIndex::new();
    for (package, version, seed, deps) in entries {
        let mut descriptor = ArtifactDescriptor::new(h(*seed));
        for (dep, constraint) in *deps {
            descriptor = descriptor.with_dependency(dep, VersionSet::parse(constraint).unwrap());
        }
        avail.insert(package, v(version), descriptor);
    }
    avail
}

/// Probe that reports a fixed installed state
pub struct StaticProbe(pub InstalledState);

impl StaticProbe {
    /// Everything in `have` is free
    pub fn free(have: Assignment) -> Self {
        let mut state = InstalledState::new();
        state.free = have;
        Self(state)
    }
}

impl InstalledProbe for StaticProbe {
    fn installed(&self, _avail: &AvailabilityIndex) -> Result<Assignment> {
        Ok(self.0.have())
    }

    fn fixed(&self, _avail: &AvailabilityIndex, _installed: &Assignment) -> Result<Assignment> {
        Ok(self.0.fixed.clone())
    }

    fn unrecognized(&self, _avail: &AvailabilityIndex) -> Result<BTreeSet<String>> {
        Ok(self.0.unrecognized.clone())
    }
}

/// Remote and storage for which every artifact is already local
pub struct AllLocal;

impl ArtifactStorage for AllLocal {
    fn contains(&self, _hash: &Hash) -> bool {
        true
    }
}

impl Remote for AllLocal {
    fn fetch(&self, _source: &str, _hash: &Hash) -> Result<()> {
        Ok(())
    }

    fn head_hash(&self, wc: &WorkingCopy) -> Result<Hash> {
        Err(Error::Config(format!("no working copy for {}", wc.package)))
    }

    fn is_dirty(&self, _wc: &WorkingCopy) -> Result<bool> {
        Ok(false)
    }

    fn is_detached(&self, _wc: &WorkingCopy) -> Result<bool> {
        Ok(false)
    }
}

/// In-memory materializer that records calls and fails on chosen ones
#[derive(Default)]
pub struct ScriptedMaterializer {
    pub tree: BTreeMap<String, Hash>,
    pub calls: Vec<String>,
    pub fail_on: BTreeSet<usize>,
}

impl ScriptedMaterializer {
    /// Start from the tree `have` would be materialized as in `avail`
    pub fn with_tree(avail: &AvailabilityIndex, have: &Assignment) -> Self {
        let tree = have
            .iter()
            .map(|(p, ver)| (p.clone(), avail.hash_of(p, ver).unwrap().clone()))
            .collect();
        Self {
            tree,
            ..Self::default()
        }
    }

    pub fn failing_on(mut self, call: usize) -> Self {
        self.fail_on.insert(call);
        self
    }

    /// Versions the tree holds, looked up in `avail`
    pub fn have(&self, avail: &AvailabilityIndex) -> Assignment {
        self.tree
            .iter()
            .map(|(p, hash)| (p.clone(), avail.version_for_hash(p, hash).unwrap().clone()))
            .collect()
    }

    fn step(&mut self, call: String) -> io::Result<()> {
        let n = self.calls.len();
        self.calls.push(call);
        if self.fail_on.contains(&n) {
            return Err(io::Error::other(format!("injected failure at call {}", n)));
        }
        Ok(())
    }
}

impl Materializer for ScriptedMaterializer {
    fn materialize(&mut self, _ws: &Workspace, package: &str, hash: &Hash) -> io::Result<()> {
        self.step(format!("materialize {}", package))?;
        self.tree.insert(package.to_string(), hash.clone());
        Ok(())
    }

    fn rematerialize(&mut self, _ws: &Workspace, package: &str, hash: &Hash) -> io::Result<()> {
        self.step(format!("rematerialize {}", package))?;
        self.tree.insert(package.to_string(), hash.clone());
        Ok(())
    }

    fn dematerialize(&mut self, _ws: &Workspace, package: &str) -> io::Result<()> {
        self.step(format!("dematerialize {}", package))?;
        self.tree.remove(package);
        Ok(())
    }
}

/// Put an artifact tree with one `VERSION` file into a mirror
pub fn publish(mirror: &Path, package: &str, hash: &Hash, version: &str) {
    let dir = mirror.join(package).join(hash.as_str());
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("VERSION"), version).unwrap();
}

/// Create `keel.toml` with default settings and the given `[requires]` body
pub fn write_config(root: &Path, requires: &str) {
    fs::write(root.join("keel.toml"), format!("[requires]\n{}", requires)).unwrap();
}
