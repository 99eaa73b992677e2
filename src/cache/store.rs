// src/cache/store.rs

//! Content-addressable artifact store
//!
//! Each artifact is a directory tree stored under its hash, fanned out like
//! git's object storage: `objects/{first2}/{rest_of_hash}/`. Imports land in a
//! temporary sibling first and are renamed into place, so a partially copied
//! tree is never visible under its final name.

use super::ArtifactStorage;
use crate::error::Result;
use crate::filesystem::copy_tree;
use crate::hash::Hash;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Directory-per-hash artifact store
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    objects_dir: PathBuf,
}

impl ArtifactStore {
    /// Open (creating if needed) a store rooted at `objects_dir`
    pub fn new<P: AsRef<Path>>(objects_dir: P) -> Result<Self> {
        let objects_dir = objects_dir.as_ref().to_path_buf();
        if !objects_dir.exists() {
            fs::create_dir_all(&objects_dir)?;
            debug!("Created artifact store at {}", objects_dir.display());
        }
        Ok(Self { objects_dir })
    }

    /// Where the tree for `hash` lives (whether or not it exists)
    pub fn path(&self, hash: &Hash) -> PathBuf {
        let (prefix, rest) = hash.split_prefix();
        self.objects_dir.join(prefix).join(rest)
    }

    /// Copy `src` into the store as `hash`. Already-present artifacts are left alone.
    pub fn import_tree(&self, hash: &Hash, src: &Path) -> Result<()> {
        let dest = self.path(hash);
        if dest.is_dir() {
            debug!("Artifact {} already in store", hash.short());
            return Ok(());
        }

        let parent = dest.parent().unwrap_or(&self.objects_dir);
        fs::create_dir_all(parent)?;
        let temp = parent.join(format!(".import-{}", Uuid::new_v4()));

        if let Err(e) = copy_tree(src, &temp) {
            let _ = fs::remove_dir_all(&temp);
            return Err(e.into());
        }
        fs::rename(&temp, &dest)?;

        debug!("Imported artifact {} from {}", hash.short(), src.display());
        Ok(())
    }
}

impl ArtifactStorage for ArtifactStore {
    fn contains(&self, hash: &Hash) -> bool {
        self.path(hash).is_dir()
    }
}
