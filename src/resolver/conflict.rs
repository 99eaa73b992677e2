// src/resolver/conflict.rs

//! Conflict types for dependency resolution
//!
//! A [`Conflict`] names the smallest subset of top-level requirements that
//! is still unsatisfiable, plus an explanation of where the search ran dry:
//! the package that ran out of candidates, every constraint on it with the
//! chain of packages that imposed it, and which constraints excluded each
//! candidate version.

use crate::requirements::RequirementSet;
use crate::version::{Version, VersionSet};
use std::fmt;

/// Where a constraint on a package came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// A top-level requirement
    Requirement,

    /// A dependency edge of a selected package
    ///
    /// `chain` lists the selections that led to `package` being required,
    /// starting at a top-level requirement.
    Dependency {
        package: String,
        version: Version,
        chain: Vec<(String, Version)>,
    },

    /// The search tentatively selected this version
    Selected,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Requirement => write!(f, "required directly"),
            Origin::Dependency {
                package,
                version,
                chain,
            } => {
                write!(f, "required by ")?;
                for (p, v) in chain {
                    write!(f, "{} {} -> ", p, v)?;
                }
                write!(f, "{} {}", package, version)
            }
            Origin::Selected => write!(f, "selected during search"),
        }
    }
}

/// One constraint on a package, with its origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub set: VersionSet,
    pub origin: Origin,
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.set, self.origin)
    }
}

/// A candidate version and the constraints that ruled it out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub version: Version,
    pub excluded_by: Vec<Constraint>,
}

/// The package the search could not find a version for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exhaustion {
    pub package: String,
    pub constraints: Vec<Constraint>,
    /// Every known version of the package, highest first
    pub rejected: Vec<Rejection>,
}

impl Exhaustion {
    /// True when the package has no versions at all after pruning
    pub fn has_no_versions(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// An unsatisfiable set of requirements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// Minimal unsatisfiable subset of the top-level requirements
    pub requirements: RequirementSet,

    /// Where the search ran dry on that subset (absent if the explanation
    /// run itself exceeded the step budget)
    pub exhausted: Option<Exhaustion>,
}

impl Conflict {
    /// Package named by the explanation, if any
    pub fn blocking_package(&self) -> Option<&str> {
        self.exhausted.as_ref().map(|e| e.package.as_str())
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "These requirements cannot be satisfied together:")?;
        for (package, set) in &self.requirements {
            writeln!(f, "  - {} {}", package, set)?;
        }

        let Some(exhausted) = &self.exhausted else {
            return write!(f, "(no further explanation within the step budget)");
        };

        if exhausted.has_no_versions() {
            writeln!(f, "No version of {} is available", exhausted.package)?;
        } else {
            writeln!(f, "No version of {} satisfies all of:", exhausted.package)?;
        }
        for constraint in &exhausted.constraints {
            writeln!(f, "  - {}", constraint)?;
        }
        for rejection in &exhausted.rejected {
            let by: Vec<String> = rejection.excluded_by.iter().map(|c| c.to_string()).collect();
            writeln!(f, "  {} {} is excluded by {}", exhausted.package, rejection.version, by.join("; "))?;
        }
        Ok(())
    }
}
