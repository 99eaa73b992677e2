// src/transaction/plan.rs

//! Executable plan: a diff with every content hash attached
//!
//! Actions run in a fixed order: installs, then updates, then removals,
//! each group sorted by package name. Every action knows its own
//! compensation, so the applier can undo it with nothing but the log.

use crate::error::{Error, Result};
use crate::filesystem::Materializer;
use crate::hash::Hash;
use crate::index::AvailabilitySource;
use crate::query::Diff;
use crate::version::Version;
use crate::workspace::Workspace;
use std::fmt;
use std::io;

/// One filesystem mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Install {
        package: String,
        version: Version,
        hash: Hash,
    },
    Update {
        package: String,
        from: Version,
        from_hash: Hash,
        to: Version,
        to_hash: Hash,
    },
    Remove {
        package: String,
        version: Version,
        hash: Hash,
    },
}

impl Action {
    pub fn package(&self) -> &str {
        match self {
            Action::Install { package, .. } => package,
            Action::Update { package, .. } => package,
            Action::Remove { package, .. } => package,
        }
    }

    /// Perform the action
    pub fn run(&self, ws: &Workspace, materializer: &mut dyn Materializer) -> io::Result<()> {
        match self {
            Action::Install { package, hash, .. } => materializer.materialize(ws, package, hash),
            Action::Update { package, to_hash, .. } => materializer.rematerialize(ws, package, to_hash),
            Action::Remove { package, .. } => materializer.dematerialize(ws, package),
        }
    }

    /// The inverse of this action, using the recorded versions and hashes
    pub fn compensation(&self) -> Compensation {
        match self {
            Action::Install { package, .. } => Compensation::Dematerialize {
                package: package.clone(),
            },
            Action::Update {
                package,
                from,
                from_hash,
                ..
            } => Compensation::Rematerialize {
                package: package.clone(),
                version: from.clone(),
                hash: from_hash.clone(),
            },
            Action::Remove { package, version, hash } => Compensation::Materialize {
                package: package.clone(),
                version: version.clone(),
                hash: hash.clone(),
            },
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Install { package, version, .. } => write!(f, "install {} {}", package, version),
            Action::Update { package, from, to, .. } => {
                write!(f, "update {} {} -> {}", package, from, to)
            }
            Action::Remove { package, version, .. } => write!(f, "remove {} {}", package, version),
        }
    }
}

/// Inverse of an applied [`Action`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compensation {
    Dematerialize {
        package: String,
    },
    Rematerialize {
        package: String,
        version: Version,
        hash: Hash,
    },
    Materialize {
        package: String,
        version: Version,
        hash: Hash,
    },
}

impl Compensation {
    pub fn run(&self, ws: &Workspace, materializer: &mut dyn Materializer) -> io::Result<()> {
        match self {
            Compensation::Dematerialize { package } => materializer.dematerialize(ws, package),
            Compensation::Rematerialize { package, hash, .. } => materializer.rematerialize(ws, package, hash),
            Compensation::Materialize { package, hash, .. } => materializer.materialize(ws, package, hash),
        }
    }
}

impl fmt::Display for Compensation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compensation::Dematerialize { package } => write!(f, "dematerialize {}", package),
            Compensation::Rematerialize { package, version, .. } => {
                write!(f, "rematerialize {} {}", package, version)
            }
            Compensation::Materialize { package, version, .. } => {
                write!(f, "materialize {} {}", package, version)
            }
        }
    }
}

/// Ordered list of actions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    actions: Vec<Action>,
}

impl Plan {
    /// Attach hashes to a diff
    ///
    /// Every version involved must be known to the source, including the
    /// installed ones: they are what a rollback restores.
    pub fn from_diff(diff: &Diff, source: &dyn AvailabilitySource) -> Result<Self> {
        let hash = |package: &str, version: &Version| {
            source
                .sha1(package, version)
                .ok_or_else(|| Error::UnknownPackage(format!("{} {}", package, version)))
        };

        let mut installs: Vec<Action> = Vec::new();
        for i in &diff.to_install {
            installs.push(Action::Install {
                package: i.package.clone(),
                version: i.version.clone(),
                hash: hash(&i.package, &i.version)?,
            });
        }

        let mut updates: Vec<Action> = Vec::new();
        for u in &diff.to_update {
            updates.push(Action::Update {
                package: u.package.clone(),
                from: u.from.clone(),
                from_hash: hash(&u.package, &u.from)?,
                to: u.to.clone(),
                to_hash: hash(&u.package, &u.to)?,
            });
        }

        let mut removals: Vec<Action> = Vec::new();
        for r in &diff.to_remove {
            removals.push(Action::Remove {
                package: r.package.clone(),
                version: r.version.clone(),
                hash: hash(&r.package, &r.version)?,
            });
        }

        let mut actions = Vec::with_capacity(diff.len());
        for mut group in [installs, updates, removals] {
            group.sort_by(|a, b| a.package().cmp(b.package()));
            actions.extend(group);
        }
        Ok(Self { actions })
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Every (package, version, hash) the plan or its rollback could need
    pub fn required_artifacts(&self) -> impl Iterator<Item = (&str, &Version, &Hash)> {
        self.actions.iter().flat_map(|action| {
            let pairs: Vec<(&str, &Version, &Hash)> = match action {
                Action::Install { package, version, hash } => vec![(package.as_str(), version, hash)],
                Action::Update {
                    package,
                    from,
                    from_hash,
                    to,
                    to_hash,
                } => vec![(package.as_str(), from, from_hash), (package.as_str(), to, to_hash)],
                Action::Remove { package, version, hash } => vec![(package.as_str(), version, hash)],
            };
            pairs
        })
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.actions.iter().map(|a| a.to_string()).collect();
        write!(f, "{}", lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{ArtifactDescriptor, AvailabilityIndex};
    use crate::query::diff;
    use crate::state::Assignment;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn h(seed: u8) -> Hash {
        Hash::parse(&format!("{:02x}", seed).repeat(20)).unwrap()
    }

    fn index() -> AvailabilityIndex {
        let mut idx = AvailabilityIndex::new();
        idx.insert("a", v("1.0.0"), ArtifactDescriptor::new(h(1)));
        idx.insert("b", v("1.0.0"), ArtifactDescriptor::new(h(2)));
        idx.insert("b", v("2.0.0"), ArtifactDescriptor::new(h(3)));
        idx.insert("c", v("1.0.0"), ArtifactDescriptor::new(h(4)));
        idx
    }

    fn assignment(pairs: &[(&str, &str)]) -> Assignment {
        pairs.iter().map(|(p, s)| (p.to_string(), v(s))).collect()
    }

    #[test]
    fn test_plan_order_and_artifacts() {
        let have = assignment(&[("b", "1.0.0"), ("c", "1.0.0")]);
        let want = assignment(&[("a", "1.0.0"), ("b", "2.0.0")]);
        let plan = Plan::from_diff(&diff(&have, &want), &index()).unwrap();

        assert_eq!(
            plan.to_string(),
            "install a 1.0.0\nupdate b 1.0.0 -> 2.0.0\nremove c 1.0.0"
        );

        let hashes: Vec<Hash> = plan.required_artifacts().map(|(_, _, h)| h.clone()).collect();
        assert_eq!(hashes, vec![h(1), h(2), h(3), h(4)]);
    }

    #[test]
    fn test_compensations_invert_actions() {
        let have = assignment(&[("b", "1.0.0"), ("c", "1.0.0")]);
        let want = assignment(&[("a", "1.0.0"), ("b", "2.0.0")]);
        let plan = Plan::from_diff(&diff(&have, &want), &index()).unwrap();

        let undo: Vec<String> = plan.actions().iter().map(|a| a.compensation().to_string()).collect();
        assert_eq!(undo, vec!["dematerialize a", "rematerialize b 1.0.0", "materialize c 1.0.0"]);
        assert_eq!(
            plan.actions()[1].compensation(),
            Compensation::Rematerialize {
                package: "b".into(),
                version: v("1.0.0"),
                hash: h(2),
            }
        );
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let have = Assignment::new();
        let want = assignment(&[("a", "9.9.9")]);
        assert!(matches!(
            Plan::from_diff(&diff(&have, &want), &index()),
            Err(Error::UnknownPackage(_))
        ));
    }
}
