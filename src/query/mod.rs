// src/query/mod.rs

//! Query engine
//!
//! Derives what the resolver works on from the raw inputs:
//! - effective requirements (declared requirements plus every fixed version)
//! - the dependency graph pruned against fixed versions
//! - the diff between installed and desired state

mod diff;

pub use diff::{diff, Diff, Install, Remove, Update};

use crate::error::{Error, Result};
use crate::index::AvailabilityIndex;
use crate::requirements::RequirementSet;
use crate::state::Assignment;
use crate::version::VersionSet;
use tracing::debug;

/// Merge declared requirements with the exact version of every fixed package
///
/// A fixed package the declared requirements exclude is an error; a fixed
/// package nobody declared is added as an exact requirement so it can never
/// be removed or moved.
pub fn effective_requirements(reqs: &RequirementSet, fixed: &Assignment) -> Result<RequirementSet> {
    let mut effective = reqs.clone();

    for (package, version) in fixed {
        let pinned = VersionSet::exact(version.clone());
        let merged = match reqs.get(package) {
            Some(declared) => declared.intersect(&pinned),
            None => pinned,
        };
        if merged.is_empty() {
            return Err(Error::ConflictingFixedRequirement {
                package: package.clone(),
                version: version.to_string(),
            });
        }
        effective.insert(package.clone(), merged);
    }

    Ok(effective)
}

/// Prune the availability index against the fixed packages
///
/// Drops every version of a fixed package other than its pinned one, and
/// every version of any other package whose dependency on a fixed package
/// excludes the pinned version. Package entries are kept even when all of
/// their versions are pruned.
pub fn dependency_graph(avail: &AvailabilityIndex, fixed: &Assignment) -> AvailabilityIndex {
    let mut deps = avail.clone();
    let before = deps.len();

    deps.retain_versions(|package, version, descriptor| {
        if let Some(pinned) = fixed.get(package) {
            return pinned == version;
        }
        descriptor
            .dependencies
            .iter()
            .all(|(dep, constraint)| fixed.get(dep).is_none_or(|pinned| constraint.contains(pinned)))
    });

    debug!(
        "Dependency graph keeps {} of {} versions ({} fixed packages)",
        deps.len(),
        before,
        fixed.len()
    );
    deps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Hash;
    use crate::index::ArtifactDescriptor;
    use crate::version::Version;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn set(s: &str) -> VersionSet {
        VersionSet::parse(s).unwrap()
    }

    fn desc(seed: u8) -> ArtifactDescriptor {
        ArtifactDescriptor::new(Hash::parse(&format!("{:02x}", seed).repeat(20)).unwrap())
    }

    #[test]
    fn test_effective_requirements_adds_fixed() {
        let mut reqs = RequirementSet::new();
        reqs.insert("a".into(), set("^1.0"));
        let mut fixed = Assignment::new();
        fixed.insert("a".into(), v("1.2.0"));
        fixed.insert("b".into(), v("0.4.0"));

        let eff = effective_requirements(&reqs, &fixed).unwrap();
        assert_eq!(eff.get("a"), Some(&VersionSet::exact(v("1.2.0"))));
        assert_eq!(eff.get("b"), Some(&VersionSet::exact(v("0.4.0"))));
    }

    #[test]
    fn test_effective_requirements_conflict() {
        let mut reqs = RequirementSet::new();
        reqs.insert("a".into(), set(">=2.0.0"));
        let mut fixed = Assignment::new();
        fixed.insert("a".into(), v("1.2.0"));

        match effective_requirements(&reqs, &fixed) {
            Err(Error::ConflictingFixedRequirement { package, version }) => {
                assert_eq!(package, "a");
                assert_eq!(version, "1.2.0");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_dependency_graph_prunes_against_fixed() {
        let mut avail = AvailabilityIndex::new();
        avail.insert("lib", v("1.0.0"), desc(1));
        avail.insert("lib", v("2.0.0"), desc(2));
        avail.insert("app", v("1.0.0"), desc(3).with_dependency("lib", set("^1.0")));
        avail.insert("app", v("2.0.0"), desc(4).with_dependency("lib", set("^2.0")));
        avail.insert("tool", v("1.0.0"), desc(5));

        let mut fixed = Assignment::new();
        fixed.insert("lib".into(), v("1.0.0"));

        let deps = dependency_graph(&avail, &fixed);
        let versions = |p: &str| deps.versions(p).unwrap().keys().cloned().collect::<Vec<_>>();
        assert_eq!(versions("lib"), vec![v("1.0.0")]);
        assert_eq!(versions("app"), vec![v("1.0.0")]);
        assert_eq!(versions("tool"), vec![v("1.0.0")]);
    }

    #[test]
    fn test_dependency_graph_keeps_empty_packages() {
        let mut avail = AvailabilityIndex::new();
        avail.insert("lib", v("1.0.0"), desc(1));
        avail.insert("app", v("1.0.0"), desc(2).with_dependency("lib", set(">=3")));

        let mut fixed = Assignment::new();
        fixed.insert("lib".into(), v("1.0.0"));

        let deps = dependency_graph(&avail, &fixed);
        assert!(deps.contains_package("app"));
        assert!(deps.versions("app").unwrap().is_empty());
    }
}
