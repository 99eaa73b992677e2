// src/resolver/sanity.rs

//! Offline consistency check of an availability index
//!
//! Every (package, version) pair is resolved in isolation. A pair with no
//! satisfying assignment can never be installed; that is a metadata
//! problem worth a warning, not an error.

use super::{Probe, Resolver};
use crate::index::AvailabilityIndex;
use crate::requirements::RequirementSet;
use crate::version::{Version, VersionSet};
use std::fmt;
use tracing::{debug, warn};

/// A version that can never be installed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanityIssue {
    pub package: String,
    pub version: Version,
    /// The package the search ran out of candidates for
    pub blocking: String,
}

impl fmt::Display for SanityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.blocking == self.package {
            write!(f, "{} {} conflicts with its own dependencies", self.package, self.version)
        } else {
            write!(
                f,
                "{} {} is uninstallable: no admissible version of {}",
                self.package, self.version, self.blocking
            )
        }
    }
}

/// Result of checking a whole index
#[derive(Debug, Clone, Default)]
pub struct SanityReport {
    /// Versions that can never be installed
    pub issues: Vec<SanityIssue>,

    /// Versions the check could not decide within the step budget
    pub undecided: Vec<(String, Version)>,

    /// Number of (package, version) pairs examined
    pub checked: usize,
}

impl SanityReport {
    pub fn is_consistent(&self) -> bool {
        self.issues.is_empty()
    }
}

pub(super) fn check(resolver: &Resolver<'_>) -> SanityReport {
    let mut report = SanityReport::default();

    for (package, versions) in resolver.deps.iter() {
        for version in versions.keys() {
            report.checked += 1;

            let mut reqs = RequirementSet::new();
            reqs.insert(package.to_string(), VersionSet::exact(version.clone()));

            match resolver.probe(&reqs) {
                Probe::Satisfiable(_) => {}
                Probe::Unsatisfiable(exhausted) => {
                    let blocking = exhausted
                        .map(|e| e.package)
                        .unwrap_or_else(|| package.to_string());
                    let issue = SanityIssue {
                        package: package.to_string(),
                        version: version.clone(),
                        blocking,
                    };
                    warn!("{}", issue);
                    report.issues.push(issue);
                }
                Probe::OutOfBudget => {
                    warn!("Could not decide whether {} {} is installable", package, version);
                    report.undecided.push((package.to_string(), version.clone()));
                }
            }
        }
    }

    debug!(
        "Sanity check examined {} versions, {} issues",
        report.checked,
        report.issues.len()
    );
    report
}

/// Report every (package, version) in `deps` that no assignment can include
pub fn sanity_check(deps: &AvailabilityIndex) -> Vec<SanityIssue> {
    Resolver::new(deps).sanity_check().issues
}
