// src/state/mod.rs

//! Installed state: what is materialized right now
//!
//! Every materialized package is either *fixed* (the resolver must keep its
//! exact version, e.g. because its working copy was modified or is held) or
//! *free* (the resolver may move it). Packages provided by the environment
//! (the platform pin) behave like fixed packages during resolution but are
//! never materialized or removed. A platform package that is materialized
//! is fixed at the pinned version.
//!
//! Materialized packages whose contents match no indexed version are
//! *unrecognized*: they are not part of the installed state, but the
//! resolver may not plan anything for them either.

mod manifest;
mod probe;

pub use manifest::{Manifest, ManifestEntry};
pub use probe::ManifestProbe;

use crate::error::{Error, Result};
use crate::index::AvailabilityIndex;
use crate::version::Version;
use crate::workspace::PlatformPin;
use std::collections::{BTreeMap, BTreeSet};

/// Package -> version. Used for installed ("have") and desired ("want") states.
pub type Assignment = BTreeMap<String, Version>;

/// Partition of the installed packages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstalledState {
    /// Versions the resolver may not change
    pub fixed: Assignment,

    /// Versions the resolver may change
    pub free: Assignment,

    /// Environment-provided packages (fixed, never materialized)
    pub provided: Assignment,

    /// Materialized packages with no known version
    pub unrecognized: BTreeSet<String>,
}

impl InstalledState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything materialized: fixed ∪ free
    pub fn have(&self) -> Assignment {
        let mut have = self.free.clone();
        have.extend(self.fixed.iter().map(|(k, v)| (k.clone(), v.clone())));
        have
    }

    /// Every version the resolver must hold: fixed ∪ provided
    pub fn pinned(&self) -> Assignment {
        let mut pinned = self.provided.clone();
        pinned.extend(self.fixed.iter().map(|(k, v)| (k.clone(), v.clone())));
        pinned
    }

    pub fn is_fixed(&self, package: &str) -> bool {
        self.fixed.contains_key(package) || self.provided.contains_key(package)
    }
}

/// Probe for the installed state of a workspace (external collaborator)
pub trait InstalledProbe {
    /// All materialized packages with their versions
    fn installed(&self, avail: &AvailabilityIndex) -> Result<Assignment>;

    /// The subset of `installed` whose versions may not change
    fn fixed(&self, avail: &AvailabilityIndex, installed: &Assignment) -> Result<Assignment>;

    /// Materialized packages `installed` could not attribute to an indexed version
    fn unrecognized(&self, _avail: &AvailabilityIndex) -> Result<BTreeSet<String>> {
        Ok(BTreeSet::new())
    }

    /// The subset of `installed` the resolver may move
    fn free(&self, installed: &Assignment, fixed: &Assignment) -> Assignment {
        installed
            .iter()
            .filter(|(name, _)| !fixed.contains_key(*name))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Probe everything at once
    ///
    /// A materialized platform package must hold the pinned version.
    fn probe(&self, avail: &AvailabilityIndex, platform: Option<&PlatformPin>) -> Result<InstalledState> {
        let installed = self.installed(avail)?;
        let mut fixed = self.fixed(avail, &installed)?;
        let unrecognized = self.unrecognized(avail)?;

        let mut provided = Assignment::new();
        if let Some(pin) = platform {
            match installed.get(&pin.name) {
                Some(version) if *version != pin.version => {
                    return Err(Error::Config(format!(
                        "platform {} is pinned to {} but {} is materialized",
                        pin.name, pin.version, version
                    )));
                }
                Some(version) => {
                    fixed.insert(pin.name.clone(), version.clone());
                }
                None if unrecognized.contains(&pin.name) => {
                    return Err(Error::Config(format!(
                        "platform {} is materialized from an unindexed artifact",
                        pin.name
                    )));
                }
                None => {
                    provided.insert(pin.name.clone(), pin.version.clone());
                }
            }
        }

        let free = self.free(&installed, &fixed);
        Ok(InstalledState {
            fixed,
            free,
            provided,
            unrecognized,
        })
    }
}
