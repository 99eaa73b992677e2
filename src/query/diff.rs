// src/query/diff.rs

//! Diff computation between installed and desired state
//!
//! The diff is a pure function of the two assignments: install what is
//! wanted but missing, update what is present at another version, remove
//! what is no longer wanted.

use crate::state::Assignment;
use crate::version::Version;
use std::fmt;

/// Materialize a package that is not present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Install {
    pub package: String,
    pub version: Version,
}

/// Move a present package to another version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub package: String,
    pub from: Version,
    pub to: Version,
}

/// Delete a package that is no longer wanted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remove {
    pub package: String,
    pub version: Version,
}

impl fmt::Display for Install {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "install {} {}", self.package, self.version)
    }
}

impl fmt::Display for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "update {} {} -> {}", self.package, self.from, self.to)
    }
}

impl fmt::Display for Remove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "remove {} {}", self.package, self.version)
    }
}

/// The delta from `have` to `want`
///
/// Each list is sorted by package name and no package appears in more than
/// one list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    pub to_install: Vec<Install>,
    pub to_update: Vec<Update>,
    pub to_remove: Vec<Remove>,
}

impl Diff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.to_install.is_empty() && self.to_update.is_empty() && self.to_remove.is_empty()
    }

    /// Total number of actions
    pub fn len(&self) -> usize {
        self.to_install.len() + self.to_update.len() + self.to_remove.len()
    }

    /// One line per action, installs first
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.len());
        lines.extend(self.to_install.iter().map(|i| i.to_string()));
        lines.extend(self.to_update.iter().map(|u| u.to_string()));
        lines.extend(self.to_remove.iter().map(|r| r.to_string()));
        lines
    }
}

impl fmt::Display for Diff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "nothing to do");
        }
        write!(f, "{}", self.lines().join("\n"))
    }
}

/// Compute the diff between two assignments
pub fn diff(have: &Assignment, want: &Assignment) -> Diff {
    let mut result = Diff::new();

    for (package, version) in want {
        match have.get(package) {
            None => result.to_install.push(Install {
                package: package.clone(),
                version: version.clone(),
            }),
            Some(current) if current != version => result.to_update.push(Update {
                package: package.clone(),
                from: current.clone(),
                to: version.clone(),
            }),
            Some(_) => {}
        }
    }

    for (package, version) in have {
        if !want.contains_key(package) {
            result.to_remove.push(Remove {
                package: package.clone(),
                version: version.clone(),
            });
        }
    }

    result
}
