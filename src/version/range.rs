// src/version/range.rs

//! Single contiguous version ranges and their normalization

use super::Version;
use std::cmp::Ordering;
use std::fmt;

/// Lower end of a range
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Lower {
    Unbounded,
    Inclusive(Version),
    Exclusive(Version),
}

/// Upper end of a range
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Upper {
    Unbounded,
    Inclusive(Version),
    Exclusive(Version),
}

/// A contiguous interval of versions
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Range {
    pub lower: Lower,
    pub upper: Upper,
}

impl Range {
    pub fn new(lower: Lower, upper: Upper) -> Self {
        Self { lower, upper }
    }

    pub fn full() -> Self {
        Self::new(Lower::Unbounded, Upper::Unbounded)
    }

    pub fn is_full(&self) -> bool {
        self.lower == Lower::Unbounded && self.upper == Upper::Unbounded
    }

    pub fn is_empty(&self) -> bool {
        match (&self.lower, &self.upper) {
            (Lower::Unbounded, _) | (_, Upper::Unbounded) => false,
            (Lower::Inclusive(l), Upper::Inclusive(u)) => l > u,
            (Lower::Inclusive(l), Upper::Exclusive(u))
            | (Lower::Exclusive(l), Upper::Inclusive(u))
            | (Lower::Exclusive(l), Upper::Exclusive(u)) => l >= u,
        }
    }

    pub fn contains(&self, v: &Version) -> bool {
        let above = match &self.lower {
            Lower::Unbounded => true,
            Lower::Inclusive(l) => v >= l,
            Lower::Exclusive(l) => v > l,
        };
        let below = match &self.upper {
            Upper::Unbounded => true,
            Upper::Inclusive(u) => v <= u,
            Upper::Exclusive(u) => v < u,
        };
        above && below
    }

    /// Overlap of two ranges, or None if they share no version
    pub fn intersect(&self, other: &Range) -> Option<Range> {
        let lower = match cmp_lower(&self.lower, &other.lower) {
            Ordering::Less => other.lower.clone(),
            _ => self.lower.clone(),
        };
        let upper = match cmp_upper(&self.upper, &other.upper) {
            Ordering::Greater => other.upper.clone(),
            _ => self.upper.clone(),
        };
        let r = Range::new(lower, upper);
        if r.is_empty() { None } else { Some(r) }
    }

    pub fn as_exact(&self) -> Option<&Version> {
        match (&self.lower, &self.upper) {
            (Lower::Inclusive(l), Upper::Inclusive(u)) if l == u => Some(l),
            _ => None,
        }
    }
}

/// Order lower bounds by where they start: unbounded first, and at the same
/// version an inclusive bound starts before an exclusive one.
fn cmp_lower(a: &Lower, b: &Lower) -> Ordering {
    fn rank(l: &Lower) -> Option<(&Version, u8)> {
        match l {
            Lower::Unbounded => None,
            Lower::Inclusive(v) => Some((v, 0)),
            Lower::Exclusive(v) => Some((v, 1)),
        }
    }
    match (rank(a), rank(b)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.cmp(&y),
    }
}

/// Order upper bounds by where they end: unbounded last, and at the same
/// version an exclusive bound ends before an inclusive one.
fn cmp_upper(a: &Upper, b: &Upper) -> Ordering {
    fn rank(u: &Upper) -> Option<(&Version, u8)> {
        match u {
            Upper::Unbounded => None,
            Upper::Exclusive(v) => Some((v, 0)),
            Upper::Inclusive(v) => Some((v, 1)),
        }
    }
    match (rank(a), rank(b)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => x.cmp(&y),
    }
}

/// True if no version lies strictly between `upper` and a following `lower`
fn connects(upper: &Upper, lower: &Lower) -> bool {
    match (upper, lower) {
        (Upper::Unbounded, _) | (_, Lower::Unbounded) => true,
        (Upper::Exclusive(u), Lower::Exclusive(l)) => l < u,
        (Upper::Inclusive(u), Lower::Inclusive(l))
        | (Upper::Inclusive(u), Lower::Exclusive(l))
        | (Upper::Exclusive(u), Lower::Inclusive(l)) => l <= u,
    }
}

/// Sort, drop empties, and merge overlapping or touching ranges
pub(super) fn normalize(mut ranges: Vec<Range>) -> Vec<Range> {
    ranges.retain(|r| !r.is_empty());
    ranges.sort_by(|a, b| cmp_lower(&a.lower, &b.lower).then_with(|| cmp_upper(&a.upper, &b.upper)));

    let mut out: Vec<Range> = Vec::with_capacity(ranges.len());
    for r in ranges {
        if let Some(last) = out.last_mut()
            && connects(&last.upper, &r.lower)
        {
            if cmp_upper(&r.upper, &last.upper) == Ordering::Greater {
                last.upper = r.upper;
            }
            continue;
        }
        out.push(r);
    }
    out
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(v) = self.as_exact() {
            return write!(f, "= {}", v);
        }
        let lower = match &self.lower {
            Lower::Unbounded => None,
            Lower::Inclusive(v) => Some(format!(">= {}", v)),
            Lower::Exclusive(v) => Some(format!("> {}", v)),
        };
        let upper = match &self.upper {
            Upper::Unbounded => None,
            Upper::Inclusive(v) => Some(format!("<= {}", v)),
            Upper::Exclusive(v) => Some(format!("< {}", v)),
        };
        match (lower, upper) {
            (None, None) => write!(f, "*"),
            (Some(l), None) => write!(f, "{}", l),
            (None, Some(u)) => write!(f, "{}", u),
            (Some(l), Some(u)) => write!(f, "{}, {}", l, u),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_empty_ranges() {
        assert!(Range::new(Lower::Inclusive(v("2.0.0")), Upper::Inclusive(v("1.0.0"))).is_empty());
        assert!(Range::new(Lower::Exclusive(v("1.0.0")), Upper::Inclusive(v("1.0.0"))).is_empty());
        assert!(!Range::new(Lower::Inclusive(v("1.0.0")), Upper::Inclusive(v("1.0.0"))).is_empty());
        assert!(!Range::full().is_empty());
    }

    #[test]
    fn test_normalize_merges_overlaps() {
        let merged = normalize(vec![
            Range::new(Lower::Inclusive(v("3.0.0")), Upper::Exclusive(v("4.0.0"))),
            Range::new(Lower::Inclusive(v("1.0.0")), Upper::Exclusive(v("2.5.0"))),
            Range::new(Lower::Inclusive(v("2.0.0")), Upper::Inclusive(v("3.0.0"))),
        ]);
        assert_eq!(
            merged,
            vec![Range::new(Lower::Inclusive(v("1.0.0")), Upper::Exclusive(v("4.0.0")))]
        );
    }

    #[test]
    fn test_intersect_picks_tighter_bounds() {
        let a = Range::new(Lower::Inclusive(v("1.0.0")), Upper::Inclusive(v("2.0.0")));
        let b = Range::new(Lower::Exclusive(v("1.0.0")), Upper::Exclusive(v("2.0.0")));
        assert_eq!(a.intersect(&b), Some(b.clone()));
        assert_eq!(b.intersect(&a), Some(b));
    }
}
