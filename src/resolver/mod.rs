// src/resolver/mod.rs

//! Dependency resolution and conflict detection
//!
//! The resolver picks exactly one version for every required package such
//! that every top-level requirement and every dependency edge between
//! selected packages holds. It is a pure function over an immutable
//! dependency graph; the search is bounded by a step budget.
//!
//! When no assignment exists, the top-level requirements are shrunk by
//! deletion to a minimal unsatisfiable subset, and the failure is explained
//! on that subset. A deletion probe that runs out of budget is treated as
//! "still needed", so the reported subset may be larger than minimal but
//! is always unsatisfiable.

mod conflict;
mod engine;
mod sanity;

pub use conflict::{Conflict, Constraint, Exhaustion, Origin, Rejection};
pub use sanity::{sanity_check, SanityIssue, SanityReport};

use crate::error::{Error, Result};
use crate::index::AvailabilityIndex;
use crate::requirements::RequirementSet;
use crate::state::Assignment;
use crate::workspace::DEFAULT_MAX_RESOLVER_STEPS;
use engine::{BudgetExceeded, Search};
use tracing::{debug, info};

/// Outcome of a single bounded search
enum Probe {
    Satisfiable(Assignment),
    Unsatisfiable(Option<Exhaustion>),
    OutOfBudget,
}

/// Version solver over a pruned dependency graph
pub struct Resolver<'a> {
    deps: &'a AvailabilityIndex,
    prefer: Option<&'a Assignment>,
    max_steps: usize,
}

impl<'a> Resolver<'a> {
    pub fn new(deps: &'a AvailabilityIndex) -> Self {
        Self {
            deps,
            prefer: None,
            max_steps: DEFAULT_MAX_RESOLVER_STEPS,
        }
    }

    /// Bound every search (including each minimization probe) to `max_steps`
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Try these versions first wherever they are still admissible
    pub fn prefer(mut self, have: &'a Assignment) -> Self {
        self.prefer = Some(have);
        self
    }

    /// Compute the desired state for `reqs`
    ///
    /// The result contains every required package and the transitive closure
    /// of their dependencies, and nothing else.
    pub fn resolve(&self, reqs: &RequirementSet) -> Result<Assignment> {
        if let Some(unknown) = reqs.keys().find(|p| !self.deps.contains_package(p)) {
            return Err(Error::UnknownPackage(unknown.clone()));
        }

        match self.probe(reqs) {
            Probe::Satisfiable(want) => {
                info!("Resolved {} requirements to {} packages", reqs.len(), want.len());
                Ok(want)
            }
            Probe::Unsatisfiable(exhausted) => {
                let conflict = self.minimize(reqs, exhausted);
                Err(Error::UnsatisfiableRequirements(Box::new(conflict)))
            }
            Probe::OutOfBudget => Err(Error::ResolutionBudgetExceeded(self.max_steps)),
        }
    }

    fn probe(&self, reqs: &RequirementSet) -> Probe {
        let mut search = Search::new(self.deps, self.prefer, self.max_steps);
        let result = search.run(reqs);
        debug!("Search over {} requirements took {} steps", reqs.len(), search.steps());
        match result {
            Ok(Some(want)) => Probe::Satisfiable(want),
            Ok(None) => Probe::Unsatisfiable(search.into_dead_end()),
            Err(BudgetExceeded) => Probe::OutOfBudget,
        }
    }

    /// Shrink an unsatisfiable requirement set by deletion
    fn minimize(&self, reqs: &RequirementSet, mut exhausted: Option<Exhaustion>) -> Conflict {
        let mut core = reqs.clone();

        for package in reqs.keys() {
            let mut candidate = core.clone();
            candidate.remove(package);

            match self.probe(&candidate) {
                Probe::Unsatisfiable(dead_end) => {
                    debug!("Requirement on {} is not part of the conflict", package);
                    core = candidate;
                    exhausted = dead_end;
                }
                Probe::Satisfiable(_) => {}
                Probe::OutOfBudget => {
                    debug!("Could not decide whether {} is needed, keeping it", package);
                }
            }
        }

        info!("Conflict narrowed to {} of {} requirements", core.len(), reqs.len());
        Conflict {
            requirements: core,
            exhausted,
        }
    }

    /// Check every (package, version) in the graph for installability
    pub fn sanity_check(&self) -> SanityReport {
        sanity::check(self)
    }
}

/// Resolve with default settings
pub fn resolve(reqs: &RequirementSet, deps: &AvailabilityIndex) -> Result<Assignment> {
    Resolver::new(deps).resolve(reqs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Hash;
    use crate::index::ArtifactDescriptor;
    use crate::version::{Version, VersionSet};

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn set(s: &str) -> VersionSet {
        VersionSet::parse(s).unwrap()
    }

    fn desc() -> ArtifactDescriptor {
        ArtifactDescriptor::new(Hash::parse(&"1e".repeat(20)).unwrap())
    }

    fn reqs(pairs: &[(&str, &str)]) -> RequirementSet {
        pairs.iter().map(|(p, s)| (p.to_string(), set(s))).collect()
    }

    /// Every selected version honors every requirement and every edge
    fn assert_consistent(reqs: &RequirementSet, deps: &AvailabilityIndex, want: &Assignment) {
        for (package, constraint) in reqs {
            let chosen = want.get(package).unwrap_or_else(|| panic!("{} missing", package));
            assert!(constraint.contains(chosen), "{} {} violates {}", package, chosen, constraint);
        }
        for (package, version) in want {
            let descriptor = deps.get(package, version).unwrap();
            for (dep, constraint) in &descriptor.dependencies {
                let chosen = want.get(dep).unwrap_or_else(|| panic!("{} missing", dep));
                assert!(constraint.contains(chosen));
            }
        }
    }

    #[test]
    fn test_resolve_transitive_closure() {
        let mut deps = AvailabilityIndex::new();
        deps.insert("app", v("1.0.0"), desc().with_dependency("lib", set("^1.2")));
        deps.insert("lib", v("1.1.0"), desc());
        deps.insert("lib", v("1.3.0"), desc().with_dependency("base", set("*")));
        deps.insert("base", v("0.1.0"), desc());
        deps.insert("unrelated", v("1.0.0"), desc());

        let r = reqs(&[("app", "*")]);
        let want = resolve(&r, &deps).unwrap();
        assert_eq!(want.keys().collect::<Vec<_>>(), vec!["app", "base", "lib"]);
        assert_eq!(want["lib"], v("1.3.0"));
        assert_consistent(&r, &deps, &want);
    }

    #[test]
    fn test_unknown_package() {
        let deps = AvailabilityIndex::new();
        assert!(matches!(
            resolve(&reqs(&[("ghost", "*")]), &deps),
            Err(Error::UnknownPackage(p)) if p == "ghost"
        ));
    }

    #[test]
    fn test_empty_requirements_resolve_to_nothing() {
        let mut deps = AvailabilityIndex::new();
        deps.insert("a", v("1.0.0"), desc());
        assert!(resolve(&RequirementSet::new(), &deps).unwrap().is_empty());
    }

    #[test]
    fn test_preferred_versions_stay_put() {
        let mut deps = AvailabilityIndex::new();
        deps.insert("a", v("1.0.0"), desc());
        deps.insert("a", v("1.5.0"), desc());
        deps.insert("b", v("2.0.0"), desc());
        deps.insert("b", v("2.1.0"), desc());

        let mut have = Assignment::new();
        have.insert("a".into(), v("1.0.0"));
        have.insert("b".into(), v("2.0.0"));

        // b's installed version is no longer admissible, a's is
        let want = Resolver::new(&deps)
            .prefer(&have)
            .resolve(&reqs(&[("a", "^1"), ("b", ">=2.1")]))
            .unwrap();
        assert_eq!(want["a"], v("1.0.0"));
        assert_eq!(want["b"], v("2.1.0"));
    }

    #[test]
    fn test_conflict_is_minimal() {
        // x and y disagree on shared; z is innocent
        let mut deps = AvailabilityIndex::new();
        deps.insert("x", v("1.0.0"), desc().with_dependency("shared", set("^1")));
        deps.insert("y", v("1.0.0"), desc().with_dependency("shared", set("^2")));
        deps.insert("z", v("1.0.0"), desc().with_dependency("shared", set("*")));
        deps.insert("shared", v("1.0.0"), desc());
        deps.insert("shared", v("2.0.0"), desc());

        let err = resolve(&reqs(&[("x", "*"), ("y", "*"), ("z", "*")]), &deps).unwrap_err();
        let Error::UnsatisfiableRequirements(conflict) = err else {
            panic!("expected a conflict, got {:?}", err);
        };
        assert_eq!(conflict.requirements.keys().collect::<Vec<_>>(), vec!["x", "y"]);
        assert_eq!(conflict.blocking_package(), Some("shared"));
        let text = conflict.to_string();
        assert!(text.contains("required by x 1.0.0"));
        assert!(text.contains("required by y 1.0.0"));
    }

    #[test]
    fn test_direct_requirement_conflict() {
        let mut deps = AvailabilityIndex::new();
        deps.insert("a", v("1.0.0"), desc());

        let err = resolve(&reqs(&[("a", ">=2")]), &deps).unwrap_err();
        let Error::UnsatisfiableRequirements(conflict) = err else {
            panic!("expected a conflict");
        };
        assert_eq!(conflict.requirements.len(), 1);
        let exhausted = conflict.exhausted.as_ref().unwrap();
        assert_eq!(exhausted.rejected[0].version, v("1.0.0"));
        assert_eq!(exhausted.rejected[0].excluded_by[0].origin, Origin::Requirement);
    }

    #[test]
    fn test_budget_exceeded() {
        let mut deps = AvailabilityIndex::new();
        for minor in 0..20 {
            deps.insert("a", Version::new(1, minor, 0), desc().with_dependency("b", set(">=5")));
        }
        deps.insert("b", v("1.0.0"), desc());

        let err = Resolver::new(&deps)
            .with_max_steps(10)
            .resolve(&reqs(&[("a", "*")]))
            .unwrap_err();
        assert!(matches!(err, Error::ResolutionBudgetExceeded(10)));
    }
}
