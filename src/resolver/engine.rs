// src/resolver/engine.rs

//! Backtracking search over the pruned dependency graph
//!
//! Each frame records the selected versions, every constraint imposed on
//! every required package (with its origin), and the chain of selections
//! that first made each package required. Frames are cloned per candidate
//! so backtracking is just dropping the clone.
//!
//! Order of decisions:
//! - the unselected package with the fewest admissible versions goes next,
//!   ties broken by name
//! - its preferred (installed) version is tried first if still admissible,
//!   then the rest from highest to lowest

use super::conflict::{Constraint, Exhaustion, Origin, Rejection};
use crate::index::AvailabilityIndex;
use crate::requirements::RequirementSet;
use crate::state::Assignment;
use crate::version::{Version, VersionSet};
use std::collections::BTreeMap;

/// The search ran out of steps before reaching an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct BudgetExceeded;

#[derive(Debug, Clone, Default)]
struct Frame {
    selected: Assignment,
    constraints: BTreeMap<String, Vec<Constraint>>,
    chains: BTreeMap<String, Vec<(String, Version)>>,
}

impl Frame {
    fn constrain(&mut self, package: &str, constraint: Constraint) {
        self.constraints
            .entry(package.to_string())
            .or_default()
            .push(constraint);
    }
}

pub(super) struct Search<'a> {
    deps: &'a AvailabilityIndex,
    prefer: Option<&'a Assignment>,
    max_steps: usize,
    steps: usize,
    dead_end: Option<Exhaustion>,
}

impl<'a> Search<'a> {
    pub(super) fn new(deps: &'a AvailabilityIndex, prefer: Option<&'a Assignment>, max_steps: usize) -> Self {
        Self {
            deps,
            prefer,
            max_steps,
            steps: 0,
            dead_end: None,
        }
    }

    /// Find an assignment satisfying `reqs`, or `None` if there is none
    pub(super) fn run(&mut self, reqs: &RequirementSet) -> Result<Option<Assignment>, BudgetExceeded> {
        let mut frame = Frame::default();
        for (package, set) in reqs {
            frame.chains.insert(package.clone(), Vec::new());
            frame.constrain(
                package,
                Constraint {
                    set: set.clone(),
                    origin: Origin::Requirement,
                },
            );
        }

        for package in reqs.keys() {
            if self.admissible(&frame, package).is_empty() {
                self.record_dead_end(&frame, package);
                return Ok(None);
            }
        }

        self.search(frame)
    }

    /// Steps spent so far
    pub(super) fn steps(&self) -> usize {
        self.steps
    }

    /// The first package the search found without candidates
    pub(super) fn into_dead_end(self) -> Option<Exhaustion> {
        self.dead_end
    }

    fn search(&mut self, frame: Frame) -> Result<Option<Assignment>, BudgetExceeded> {
        let next = frame
            .constraints
            .keys()
            .filter(|p| !frame.selected.contains_key(*p))
            .map(|p| (self.admissible(&frame, p).len(), p))
            .min();

        let Some((_, package)) = next else {
            return Ok(Some(frame.selected));
        };
        let package = package.clone();

        let candidates = self.ordered_candidates(&frame, &package);
        if candidates.is_empty() {
            self.record_dead_end(&frame, &package);
            return Ok(None);
        }

        for version in candidates {
            self.steps += 1;
            if self.steps > self.max_steps {
                return Err(BudgetExceeded);
            }

            let mut next = frame.clone();
            if !self.select(&mut next, &package, &version) {
                continue;
            }
            if let Some(found) = self.search(next)? {
                return Ok(Some(found));
            }
        }

        Ok(None)
    }

    /// Versions of `package` in the graph satisfying every constraint, highest first
    fn admissible(&self, frame: &Frame, package: &str) -> Vec<Version> {
        let Some(versions) = self.deps.versions(package) else {
            return Vec::new();
        };
        let constraints = frame.constraints.get(package).map(Vec::as_slice).unwrap_or(&[]);
        versions
            .keys()
            .rev()
            .filter(|v| constraints.iter().all(|c| c.set.contains(v)))
            .cloned()
            .collect()
    }

    fn ordered_candidates(&self, frame: &Frame, package: &str) -> Vec<Version> {
        let mut candidates = self.admissible(frame, package);
        if let Some(installed) = self.prefer.and_then(|p| p.get(package))
            && let Some(pos) = candidates.iter().position(|v| v == installed)
        {
            let preferred = candidates.remove(pos);
            candidates.insert(0, preferred);
        }
        candidates
    }

    /// Select `version` for `package` and impose its dependency edges
    ///
    /// Returns false if some dependency is left without admissible versions.
    fn select(&mut self, frame: &mut Frame, package: &str, version: &Version) -> bool {
        let deps = self.deps;
        let Some(descriptor) = deps.get(package, version) else {
            return false;
        };

        frame.selected.insert(package.to_string(), version.clone());
        frame.constrain(
            package,
            Constraint {
                set: VersionSet::exact(version.clone()),
                origin: Origin::Selected,
            },
        );

        let chain = frame.chains.get(package).cloned().unwrap_or_default();
        for (dep, set) in &descriptor.dependencies {
            frame.chains.entry(dep.clone()).or_insert_with(|| {
                let mut path = chain.clone();
                path.push((package.to_string(), version.clone()));
                path
            });
            frame.constrain(
                dep,
                Constraint {
                    set: set.clone(),
                    origin: Origin::Dependency {
                        package: package.to_string(),
                        version: version.clone(),
                        chain: chain.clone(),
                    },
                },
            );
        }

        for dep in descriptor.dependencies.keys() {
            if self.admissible(frame, dep).is_empty() {
                self.record_dead_end(frame, dep);
                return false;
            }
        }
        true
    }

    fn record_dead_end(&mut self, frame: &Frame, package: &str) {
        if self.dead_end.is_some() {
            return;
        }

        let constraints = frame.constraints.get(package).cloned().unwrap_or_default();
        let rejected = self
            .deps
            .versions(package)
            .map(|versions| {
                versions
                    .keys()
                    .rev()
                    .map(|v| Rejection {
                        version: v.clone(),
                        excluded_by: constraints.iter().filter(|c| !c.set.contains(v)).cloned().collect(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        self.dead_end = Some(Exhaustion {
            package: package.to_string(),
            constraints,
            rejected,
        });
    }
}
