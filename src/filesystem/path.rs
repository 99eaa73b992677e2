// src/filesystem/path.rs

//! Package names from untrusted sources
//!
//! Every package name ends up as a directory under the packages directory
//! and as a path segment in the mirror, so a name from an index must be a
//! single plain path component.

use crate::error::{Error, Result};
use std::path::{Component, Path};

/// Check that `name` is safe to join onto a workspace directory
///
/// Rejected:
/// - empty names and names with surrounding whitespace
/// - `.` and `..`, or any name with a path separator or NUL
/// - names starting with `.`, which are reserved for staging directories
///
/// ```
/// use keel::filesystem::validate_package_name;
///
/// assert!(validate_package_name("json-tools").is_ok());
/// assert!(validate_package_name("../etc").is_err());
/// assert!(validate_package_name("a/b").is_err());
/// ```
pub fn validate_package_name(name: &str) -> Result<()> {
    let invalid = || Error::InvalidPackageName(name.to_string());

    if name.is_empty() || name.trim() != name || name.starts_with('.') {
        return Err(invalid());
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(invalid());
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(invalid()),
    }
}
