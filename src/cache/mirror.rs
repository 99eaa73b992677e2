// src/cache/mirror.rs

//! Remote backed by a local artifact mirror
//!
//! The mirror holds one directory per artifact: `<mirror>/<source>/<hash>/`.
//! Working-copy questions are answered from the installed manifest: the head
//! is the hash recorded at materialization, a working copy is dirty when its
//! tree digest no longer matches the recorded one, and detached when the user
//! has held it.

use super::{ArtifactStore, Remote, WorkingCopy};
use crate::error::{Error, Result};
use crate::hash::{tree_digest, Hash};
use crate::state::{Manifest, ManifestEntry};
use std::io;
use std::path::{Path, PathBuf};

/// Entries inside a working copy that never count as modifications
pub const IGNORED_ENTRIES: &[&str] = &[".git"];

pub struct MirrorRemote {
    mirror_root: PathBuf,
    manifest_path: PathBuf,
    store: ArtifactStore,
}

impl MirrorRemote {
    pub fn new<P: AsRef<Path>>(mirror_root: P, manifest_path: P, store: ArtifactStore) -> Self {
        Self {
            mirror_root: mirror_root.as_ref().to_path_buf(),
            manifest_path: manifest_path.as_ref().to_path_buf(),
            store,
        }
    }

    fn entry(&self, wc: &WorkingCopy) -> Result<ManifestEntry> {
        let manifest = Manifest::load(&self.manifest_path)?;
        manifest.get(&wc.package).cloned().ok_or_else(|| {
            Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not materialized", wc.package),
            ))
        })
    }
}

impl Remote for MirrorRemote {
    fn fetch(&self, source: &str, hash: &Hash) -> Result<()> {
        let src = self.mirror_root.join(source).join(hash.as_str());
        if !src.is_dir() {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found in mirror", src.display()),
            )));
        }
        self.store.import_tree(hash, &src)
    }

    fn head_hash(&self, wc: &WorkingCopy) -> Result<Hash> {
        Ok(self.entry(wc)?.hash)
    }

    fn is_dirty(&self, wc: &WorkingCopy) -> Result<bool> {
        let entry = self.entry(wc)?;
        if !wc.path.is_dir() {
            return Ok(true);
        }
        Ok(tree_digest(&wc.path, IGNORED_ENTRIES)? != entry.digest)
    }

    fn is_detached(&self, wc: &WorkingCopy) -> Result<bool> {
        Ok(self.entry(wc)?.held)
    }
}
