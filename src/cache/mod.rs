// src/cache/mod.rs

//! Artifact cache gate
//!
//! Before a transaction mutates anything, every artifact it could touch
//! (including the ones needed to roll back) must already be in the local
//! store. The [`CacheGate`] fetches what is missing through a [`Remote`] and
//! refuses to let the run continue if anything is still unavailable, so a
//! network failure is never discovered halfway through a change.

mod mirror;
mod store;

pub use mirror::{MirrorRemote, IGNORED_ENTRIES};
pub use store::ArtifactStore;

use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::index::AvailabilitySource;
use crate::transaction::Plan;
use crate::version::Version;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// A package's materialized working copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingCopy {
    pub package: String,
    pub path: PathBuf,
}

/// Remote access (external collaborator)
///
/// Fetches artifacts into the local store and answers questions about
/// working copies. How a remote is actually reached is up to the
/// implementation.
pub trait Remote {
    /// Make the artifact `hash` from `source` available locally
    fn fetch(&self, source: &str, hash: &Hash) -> Result<()>;

    /// Artifact the working copy currently holds
    fn head_hash(&self, wc: &WorkingCopy) -> Result<Hash>;

    /// Whether the working copy has local modifications
    fn is_dirty(&self, wc: &WorkingCopy) -> Result<bool>;

    /// Whether the working copy is detached from anything the resolver may move
    fn is_detached(&self, wc: &WorkingCopy) -> Result<bool>;
}

/// Local view of which artifacts are already present
pub trait ArtifactStorage {
    fn contains(&self, hash: &Hash) -> bool;
}

/// An artifact the gate could not obtain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingArtifact {
    pub package: String,
    pub version: Version,
    pub hash: Hash,
}

impl fmt::Display for MissingArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.package, self.version, self.hash.short())
    }
}

/// Prefetch gate in front of the transactional applier
pub struct CacheGate<'a> {
    remote: &'a dyn Remote,
    storage: &'a dyn ArtifactStorage,
}

impl<'a> CacheGate<'a> {
    pub fn new(remote: &'a dyn Remote, storage: &'a dyn ArtifactStorage) -> Self {
        Self { remote, storage }
    }

    /// Try to make every hash available; return the ones still missing
    ///
    /// Hashes already in storage are not fetched again. A fetch that reports
    /// success without the artifact showing up counts as missing.
    pub fn prefetch(&self, package: &str, source: &str, hashes: &BTreeSet<Hash>) -> BTreeSet<Hash> {
        let mut missing = BTreeSet::new();

        for hash in hashes {
            if self.storage.contains(hash) {
                debug!("{} {} already cached", package, hash.short());
                continue;
            }

            match self.remote.fetch(source, hash) {
                Ok(()) if self.storage.contains(hash) => {
                    debug!("Fetched {} {} from {}", package, hash.short(), source);
                }
                Ok(()) => {
                    warn!("Fetch of {} {} reported success but artifact is absent", package, hash.short());
                    missing.insert(hash.clone());
                }
                Err(e) => {
                    warn!("Failed to fetch {} {} from {}: {}", package, hash.short(), source, e);
                    missing.insert(hash.clone());
                }
            }
        }

        missing
    }

    /// Ensure every artifact the plan references is local
    ///
    /// Covers installed hashes, both sides of every update, and every removed
    /// hash (needed to roll a removal back). Fails with
    /// [`Error::MissingArtifacts`] if anything is still missing.
    pub fn ensure_plan(&self, plan: &Plan, source: &dyn AvailabilitySource) -> Result<()> {
        // package -> hash -> version, so reports can name the version
        let mut wanted: BTreeMap<&str, BTreeMap<&Hash, &Version>> = BTreeMap::new();
        for (package, version, hash) in plan.required_artifacts() {
            wanted.entry(package).or_default().insert(hash, version);
        }

        let mut missing = Vec::new();
        for (package, hashes) in &wanted {
            let set: BTreeSet<Hash> = hashes.keys().map(|h| (*h).clone()).collect();
            let still_missing = match source.url(package) {
                Some(url) => self.prefetch(package, &url, &set),
                None => {
                    warn!("No source location for {}", package);
                    set.iter()
                        .filter(|h| !self.storage.contains(h))
                        .cloned()
                        .collect()
                }
            };
            for (hash, version) in hashes {
                if still_missing.contains(*hash) {
                    missing.push(MissingArtifact {
                        package: package.to_string(),
                        version: (*version).clone(),
                        hash: (*hash).clone(),
                    });
                }
            }
        }

        if missing.is_empty() {
            info!("All {} artifacts available", wanted.values().map(|h| h.len()).sum::<usize>());
            Ok(())
        } else {
            Err(Error::MissingArtifacts(missing))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn hash(seed: u8) -> Hash {
        Hash::parse(&format!("{:02x}", seed).repeat(20)).unwrap()
    }

    /// Remote that "fetches" into a shared in-memory set unless the hash is unreachable
    struct FakeRemote<'a> {
        storage: &'a FakeStorage,
        unreachable: BTreeSet<Hash>,
        fetched: RefCell<Vec<Hash>>,
    }

    #[derive(Default)]
    struct FakeStorage {
        present: RefCell<BTreeSet<Hash>>,
    }

    impl ArtifactStorage for FakeStorage {
        fn contains(&self, hash: &Hash) -> bool {
            self.present.borrow().contains(hash)
        }
    }

    impl Remote for FakeRemote<'_> {
        fn fetch(&self, _source: &str, hash: &Hash) -> Result<()> {
            self.fetched.borrow_mut().push(hash.clone());
            if self.unreachable.contains(hash) {
                return Err(Error::Io(std::io::Error::other("unreachable")));
            }
            self.storage.present.borrow_mut().insert(hash.clone());
            Ok(())
        }

        fn head_hash(&self, _wc: &WorkingCopy) -> Result<Hash> {
            unreachable!()
        }

        fn is_dirty(&self, _wc: &WorkingCopy) -> Result<bool> {
            Ok(false)
        }

        fn is_detached(&self, _wc: &WorkingCopy) -> Result<bool> {
            Ok(false)
        }
    }

    #[test]
    fn test_prefetch_skips_cached_and_reports_failures() {
        let storage = FakeStorage::default();
        storage.present.borrow_mut().insert(hash(1));
        let remote = FakeRemote {
            storage: &storage,
            unreachable: [hash(3)].into_iter().collect(),
            fetched: RefCell::new(Vec::new()),
        };
        let gate = CacheGate::new(&remote, &storage);

        let wanted: BTreeSet<Hash> = [hash(1), hash(2), hash(3)].into_iter().collect();
        let missing = gate.prefetch("a", "mirror/a", &wanted);

        assert_eq!(missing, [hash(3)].into_iter().collect());
        assert_eq!(*remote.fetched.borrow(), vec![hash(2), hash(3)]);
    }

    #[test]
    fn test_silent_fetch_failure_counts_as_missing() {
        struct LyingRemote;
        impl Remote for LyingRemote {
            fn fetch(&self, _source: &str, _hash: &Hash) -> Result<()> {
                Ok(())
            }
            fn head_hash(&self, _wc: &WorkingCopy) -> Result<Hash> {
                unreachable!()
            }
            fn is_dirty(&self, _wc: &WorkingCopy) -> Result<bool> {
                Ok(false)
            }
            fn is_detached(&self, _wc: &WorkingCopy) -> Result<bool> {
                Ok(false)
            }
        }

        let storage = FakeStorage::default();
        let gate = CacheGate::new(&LyingRemote, &storage);
        let wanted: BTreeSet<Hash> = [hash(7)].into_iter().collect();
        assert_eq!(gate.prefetch("a", "src", &wanted), wanted);
    }
}
