// src/version/mod.rs

//! Versions and version sets for package requirements
//!
//! A [`Version`] is a semantic version with a total order. A [`VersionSet`]
//! is a union of disjoint ranges over that order and is closed under
//! intersection and union. The empty set is a legitimate value and is
//! distinct from [`VersionSet::any`].
//!
//! Pre-release versions take part in the ordering like any other version;
//! a range admits a pre-release exactly when it falls between the bounds.

mod range;

pub use range::{Lower, Range, Upper};

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A totally ordered package version
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version(semver::Version);

impl Version {
    /// Create a plain `major.minor.patch` version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self(semver::Version::new(major, minor, patch))
    }

    /// Parse a version string
    ///
    /// Full semver is accepted as-is. Shortened forms such as "1" or "1.2"
    /// are padded with zeros, so "1.2" parses as 1.2.0.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let s = s.strip_prefix('v').unwrap_or(s);
        if let Ok(v) = semver::Version::parse(s) {
            return Ok(Self(v));
        }

        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() < 3 && parts.iter().all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit())) {
            let mut padded = parts.join(".");
            for _ in parts.len()..3 {
                padded.push_str(".0");
            }
            return semver::Version::parse(&padded)
                .map(Self)
                .map_err(|e| Error::InvalidVersion {
                    input: s.to_string(),
                    reason: e.to_string(),
                });
        }

        semver::Version::parse(s)
            .map(Self)
            .map_err(|e| Error::InvalidVersion {
                input: s.to_string(),
                reason: e.to_string(),
            })
    }

    /// Compare two versions
    pub fn compare(&self, other: &Version) -> Ordering {
        self.cmp(other)
    }

    pub fn major(&self) -> u64 {
        self.0.major
    }

    pub fn minor(&self) -> u64 {
        self.0.minor
    }

    pub fn patch(&self) -> u64 {
        self.0.patch
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<Version> for String {
    fn from(v: Version) -> Self {
        v.to_string()
    }
}

/// A constraint over versions: a normalized union of ranges
///
/// Ranges are kept sorted, non-empty, non-overlapping and non-adjacent, so
/// two sets admitting the same versions compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionSet {
    ranges: Vec<Range>,
}

impl VersionSet {
    /// The unconstrained set
    pub fn any() -> Self {
        Self {
            ranges: vec![Range::full()],
        }
    }

    /// The set admitting no version at all
    pub fn empty() -> Self {
        Self { ranges: Vec::new() }
    }

    /// The singleton set `{version}`
    pub fn exact(version: Version) -> Self {
        Self::from_range(Range::new(
            Lower::Inclusive(version.clone()),
            Upper::Inclusive(version),
        ))
    }

    /// Build a set from a single range (empty ranges yield the empty set)
    pub fn from_range(range: Range) -> Self {
        Self::from_ranges(vec![range])
    }

    /// Build a set from arbitrary ranges, normalizing them
    pub fn from_ranges(ranges: Vec<Range>) -> Self {
        Self {
            ranges: range::normalize(ranges),
        }
    }

    /// Check whether `version` is admitted
    pub fn contains(&self, version: &Version) -> bool {
        self.ranges.iter().any(|r| r.contains(version))
    }

    /// Versions admitted by both sets. Returns the empty set when none are.
    pub fn intersect(&self, other: &VersionSet) -> VersionSet {
        let mut out = Vec::new();
        for a in &self.ranges {
            for b in &other.ranges {
                if let Some(r) = a.intersect(b) {
                    out.push(r);
                }
            }
        }
        Self::from_ranges(out)
    }

    /// Versions admitted by either set
    pub fn union(&self, other: &VersionSet) -> VersionSet {
        let mut all = self.ranges.clone();
        all.extend(other.ranges.iter().cloned());
        Self::from_ranges(all)
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn is_any(&self) -> bool {
        self.ranges.len() == 1 && self.ranges[0].is_full()
    }

    /// The single version admitted, if the set is a singleton
    pub fn as_exact(&self) -> Option<&Version> {
        match self.ranges.as_slice() {
            [r] => r.as_exact(),
            _ => None,
        }
    }

    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    /// Parse a constraint string
    ///
    /// Examples:
    /// - "*" → any version
    /// - ">= 1.2.0, < 2.0.0" → a half-open range
    /// - "^1.4" → >= 1.4.0, < 2.0.0
    /// - "^0.0" → >= 0.0.0, < 0.1.0 (the written components count)
    /// - "~1.4.2" → >= 1.4.2, < 1.5.0
    /// - "~1" → >= 1.0.0, < 2.0.0
    /// - "1.0.0 || >= 3.0.0" → a union
    /// - "1.0.0" or "= 1.0.0" → exactly 1.0.0
    /// - "none" → the empty set
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidConstraint(s.to_string()));
        }
        if s == "none" {
            return Ok(Self::empty());
        }

        let mut set = Self::empty();
        for alternative in s.split("||") {
            let mut alt = Self::any();
            for term in alternative.split(',') {
                alt = alt.intersect(&parse_term(term.trim(), s)?);
            }
            set = set.union(&alt);
        }
        Ok(set)
    }
}

fn parse_term(term: &str, whole: &str) -> Result<VersionSet> {
    let invalid = || Error::InvalidConstraint(whole.to_string());
    if term.is_empty() {
        return Err(invalid());
    }
    if term == "*" {
        return Ok(VersionSet::any());
    }

    let version = |rest: &str| Version::parse(rest.trim()).map_err(|_| invalid());

    let range = if let Some(rest) = term.strip_prefix(">=") {
        Range::new(Lower::Inclusive(version(rest)?), Upper::Unbounded)
    } else if let Some(rest) = term.strip_prefix("<=") {
        Range::new(Lower::Unbounded, Upper::Inclusive(version(rest)?))
    } else if let Some(rest) = term.strip_prefix('>') {
        Range::new(Lower::Exclusive(version(rest)?), Upper::Unbounded)
    } else if let Some(rest) = term.strip_prefix('<') {
        Range::new(Lower::Unbounded, Upper::Exclusive(version(rest)?))
    } else if let Some(rest) = term.strip_prefix('^') {
        let v = version(rest)?;
        let ceiling = caret_ceiling(&v, components(rest));
        Range::new(Lower::Inclusive(v), ceiling)
    } else if let Some(rest) = term.strip_prefix('~') {
        let v = version(rest)?;
        let ceiling = tilde_ceiling(&v, components(rest));
        Range::new(Lower::Inclusive(v), ceiling)
    } else if let Some(rest) = term.strip_prefix('=') {
        return Ok(VersionSet::exact(version(rest)?));
    } else {
        return Ok(VersionSet::exact(version(term)?));
    };

    Ok(VersionSet::from_range(range))
}

/// Number of dotted components written before any pre-release or build tag
fn components(rest: &str) -> usize {
    let rest = rest.trim();
    let rest = rest.strip_prefix('v').unwrap_or(rest);
    let core = rest.split(['-', '+']).next().unwrap_or(rest);
    core.split('.').count()
}

/// Exclusive bound `major.minor.patch`; unbounded if a component overflows
fn bump(major: Option<u64>, minor: Option<u64>, patch: Option<u64>) -> Upper {
    match (major, minor, patch) {
        (Some(major), Some(minor), Some(patch)) => Upper::Exclusive(Version::new(major, minor, patch)),
        _ => Upper::Unbounded,
    }
}

fn caret_ceiling(v: &Version, written: usize) -> Upper {
    if v.major() > 0 || written == 1 {
        bump(v.major().checked_add(1), Some(0), Some(0))
    } else if v.minor() > 0 || written == 2 {
        bump(Some(0), v.minor().checked_add(1), Some(0))
    } else {
        bump(Some(0), Some(0), v.patch().checked_add(1))
    }
}

fn tilde_ceiling(v: &Version, written: usize) -> Upper {
    if written == 1 {
        bump(v.major().checked_add(1), Some(0), Some(0))
    } else {
        bump(Some(v.major()), v.minor().checked_add(1), Some(0))
    }
}

impl fmt::Display for VersionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ranges.is_empty() {
            return write!(f, "none");
        }
        let parts: Vec<String> = self.ranges.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", parts.join(" || "))
    }
}

impl FromStr for VersionSet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for VersionSet {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<VersionSet> for String {
    fn from(set: VersionSet) -> Self {
        set.to_string()
    }
}

impl Default for VersionSet {
    fn default() -> Self {
        Self::any()
    }
}
