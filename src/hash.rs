// src/hash.rs

//! Content hashes and tree digests
//!
//! Two kinds of hash show up in keel:
//!
//! | Kind | Where it comes from | Used for |
//! |------|---------------------|----------|
//! | [`Hash`] | the availability index (a VCS object id, usually SHA-1) | naming artifacts in the store |
//! | tree digest | computed locally with SHA-256 | detecting modified working copies |

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use walkdir::WalkDir;

/// Shortest object id we accept (abbreviated ids are ambiguous below this)
const MIN_HEX_LEN: usize = 7;

/// Identifier of an exact artifact tree
///
/// Stored lowercase. Any even-length hex string of at least seven characters
/// is accepted; SHA-1 (40 chars) and SHA-256 (64 chars) ids are the usual case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Hash(String);

impl Hash {
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim().to_ascii_lowercase();
        if s.len() < MIN_HEX_LEN || hex::decode(&s).is_err() {
            return Err(Error::InvalidHash(s));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split into the two-character fan-out prefix and the remainder
    ///
    /// Used for storage layout: objects/{prefix}/{rest}
    pub fn split_prefix(&self) -> (&str, &str) {
        self.0.split_at(2)
    }

    /// Abbreviated form for log output
    pub fn short(&self) -> &str {
        &self.0[..MIN_HEX_LEN.min(self.0.len())]
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Hash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Hash {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<Hash> for String {
    fn from(h: Hash) -> Self {
        h.0
    }
}

/// SHA-256 digest over a directory tree
///
/// Covers every regular file and symlink under `root` (sorted by relative
/// path), hashing the path, a type tag and the content or link target.
/// Entries whose first path component is in `skip` are ignored.
pub fn tree_digest(root: &Path, skip: &[&str]) -> Result<String> {
    let mut hasher = Sha256::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            let rel = e.path().strip_prefix(root).unwrap_or(e.path());
            match rel.components().next() {
                Some(first) => !skip.iter().any(|s| first.as_os_str() == *s),
                None => true,
            }
        });

    for entry in walker {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            let target = fs::read_link(entry.path())?;
            hasher.update(b"L");
            hasher.update(rel.to_string_lossy().as_bytes());
            hasher.update([0]);
            hasher.update(target.to_string_lossy().as_bytes());
        } else if file_type.is_file() {
            hasher.update(b"F");
            hasher.update(rel.to_string_lossy().as_bytes());
            hasher.update([0]);
            hasher.update(fs::read(entry.path())?);
        } else {
            continue;
        }
        hasher.update([0]);
    }

    Ok(hex::encode(hasher.finalize()))
}
