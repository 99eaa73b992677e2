// src/state/probe.rs

//! Installed-state probe driven by the manifest and a [`Remote`]

use super::{Assignment, InstalledProbe, Manifest};
use crate::cache::{Remote, WorkingCopy};
use crate::error::Result;
use crate::index::AvailabilityIndex;
use crate::workspace::Workspace;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Reads materialized packages from the manifest, then asks the remote
/// what each working copy actually holds
pub struct ManifestProbe<'a> {
    ws: &'a Workspace,
    remote: &'a dyn Remote,
}

impl<'a> ManifestProbe<'a> {
    pub fn new(ws: &'a Workspace, remote: &'a dyn Remote) -> Self {
        Self { ws, remote }
    }

    fn working_copy(&self, package: &str) -> WorkingCopy {
        WorkingCopy {
            package: package.to_string(),
            path: self.ws.package_dir(package),
        }
    }
}

impl ManifestProbe<'_> {
    /// Split manifest entries into indexed versions and packages with no known version
    fn scan(&self, avail: &AvailabilityIndex) -> Result<(Assignment, BTreeSet<String>)> {
        let manifest = Manifest::load(self.ws.manifest_path())?;
        let mut installed = Assignment::new();
        let mut unrecognized = BTreeSet::new();

        for (package, _) in manifest.packages() {
            let wc = self.working_copy(package);
            let head = match self.remote.head_hash(&wc) {
                Ok(head) => head,
                Err(e) => {
                    debug!("Cannot determine what {} holds: {}", package, e);
                    unrecognized.insert(package.to_string());
                    continue;
                }
            };

            match avail.version_for_hash(package, &head) {
                Some(version) => {
                    installed.insert(package.to_string(), version.clone());
                }
                None => {
                    debug!("{} holds {} which no indexed version matches", package, head.short());
                    unrecognized.insert(package.to_string());
                }
            }
        }

        Ok((installed, unrecognized))
    }
}

impl InstalledProbe for ManifestProbe<'_> {
    fn installed(&self, avail: &AvailabilityIndex) -> Result<Assignment> {
        let (installed, _) = self.scan(avail)?;
        debug!("Found {} installed packages", installed.len());
        Ok(installed)
    }

    fn unrecognized(&self, avail: &AvailabilityIndex) -> Result<BTreeSet<String>> {
        let (_, unrecognized) = self.scan(avail)?;
        for package in &unrecognized {
            warn!("{} is materialized but matches no indexed version", package);
        }
        Ok(unrecognized)
    }

    fn fixed(&self, _avail: &AvailabilityIndex, installed: &Assignment) -> Result<Assignment> {
        let mut fixed = Assignment::new();

        for (package, version) in installed {
            let wc = self.working_copy(package);
            let pinned = match (self.remote.is_dirty(&wc), self.remote.is_detached(&wc)) {
                (Ok(dirty), Ok(detached)) => {
                    if dirty {
                        debug!("{} has local modifications", package);
                    }
                    if detached {
                        debug!("{} is held", package);
                    }
                    dirty || detached
                }
                (Err(e), _) | (_, Err(e)) => {
                    warn!("Cannot inspect {}, keeping it at {}: {}", package, version, e);
                    true
                }
            };

            if pinned {
                fixed.insert(package.clone(), version.clone());
            }
        }

        Ok(fixed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ArtifactStore, MirrorRemote, IGNORED_ENTRIES};
    use crate::hash::{tree_digest, Hash};
    use crate::index::ArtifactDescriptor;
    use crate::version::Version;
    use crate::workspace::Settings;
    use std::fs;
    use tempfile::TempDir;

    fn h(seed: &str) -> Hash {
        Hash::parse(&seed.repeat(20)).unwrap()
    }

    fn materialize(ws: &Workspace, manifest: &mut Manifest, package: &str, hash: Hash) {
        let dir = ws.package_dir(package);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("src.txt"), package).unwrap();
        manifest.record(package, hash, tree_digest(&dir, IGNORED_ENTRIES).unwrap());
    }

    #[test]
    fn test_probe_partitions_packages() {
        let temp = TempDir::new().unwrap();
        let ws = Workspace::new(temp.path(), Settings::default());

        let mut avail = AvailabilityIndex::new();
        avail.insert("clean", Version::new(1, 0, 0), ArtifactDescriptor::new(h("a1")));
        avail.insert("dirty", Version::new(1, 0, 0), ArtifactDescriptor::new(h("b1")));
        avail.insert("held", Version::new(2, 0, 0), ArtifactDescriptor::new(h("c1")));

        let mut manifest = Manifest::load(ws.manifest_path()).unwrap();
        materialize(&ws, &mut manifest, "clean", h("a1"));
        materialize(&ws, &mut manifest, "dirty", h("b1"));
        materialize(&ws, &mut manifest, "held", h("c1"));
        materialize(&ws, &mut manifest, "stray", h("d1"));
        manifest.set_held("held", true);
        manifest.save().unwrap();
        fs::write(ws.package_dir("dirty").join("src.txt"), "edited").unwrap();

        let store = ArtifactStore::new(ws.objects_dir()).unwrap();
        let remote = MirrorRemote::new(ws.mirror_path(), ws.manifest_path(), store);
        let probe = ManifestProbe::new(&ws, &remote);

        let state = probe.probe(&avail, None).unwrap();
        assert_eq!(state.free.keys().collect::<Vec<_>>(), vec!["clean"]);
        assert_eq!(state.fixed.keys().collect::<Vec<_>>(), vec!["dirty", "held"]);
        // Unindexed hashes are not part of the installed state
        assert!(!state.have().contains_key("stray"));
        assert_eq!(state.unrecognized.iter().collect::<Vec<_>>(), vec!["stray"]);
    }

    #[test]
    fn test_platform_is_provided_unless_installed() {
        let temp = TempDir::new().unwrap();
        let ws = Workspace::new(temp.path(), Settings::default());
        let store = ArtifactStore::new(ws.objects_dir()).unwrap();
        let remote = MirrorRemote::new(ws.mirror_path(), ws.manifest_path(), store);
        let probe = ManifestProbe::new(&ws, &remote);

        let pin = crate::workspace::PlatformPin {
            name: "runtime".into(),
            version: Version::new(8, 0, 0),
        };
        let state = probe.probe(&AvailabilityIndex::new(), Some(&pin)).unwrap();
        assert!(state.have().is_empty());
        assert_eq!(state.provided.get("runtime"), Some(&Version::new(8, 0, 0)));
    }
}
