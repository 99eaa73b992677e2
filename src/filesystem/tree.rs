// src/filesystem/tree.rs

//! Deploys artifact trees from the store into the workspace
//!
//! Every operation stages its work next to the final location and finishes
//! with a rename, so a package directory is always either the old tree or
//! the new one. The installed manifest is updated after the tree is in place.

use super::{copy_tree, Materializer};
use crate::cache::{ArtifactStore, IGNORED_ENTRIES};
use crate::error::Error;
use crate::hash::{tree_digest, Hash};
use crate::state::Manifest;
use crate::workspace::Workspace;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Materializer backed by an [`ArtifactStore`]
pub struct TreeMaterializer {
    store: ArtifactStore,
}

fn to_io(e: Error) -> io::Error {
    match e {
        Error::Io(inner) => inner,
        other => io::Error::other(other.to_string()),
    }
}

impl TreeMaterializer {
    pub fn new(store: ArtifactStore) -> Self {
        Self { store }
    }

    /// Copy the artifact into a fresh staging directory beside `dest`
    fn stage(&self, dest: &Path, hash: &Hash) -> io::Result<PathBuf> {
        let src = self.store.path(hash);
        if !src.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("artifact {} is not in the store", hash.short()),
            ));
        }

        let parent = dest.parent().ok_or_else(|| io::Error::other("package path has no parent"))?;
        fs::create_dir_all(parent)?;
        let staged = parent.join(format!(".stage-{}", Uuid::new_v4()));
        if let Err(e) = copy_tree(&src, &staged) {
            let _ = fs::remove_dir_all(&staged);
            return Err(e);
        }
        Ok(staged)
    }

    fn record(&self, ws: &Workspace, package: &str, hash: &Hash, dest: &Path) -> io::Result<()> {
        let digest = tree_digest(dest, IGNORED_ENTRIES).map_err(to_io)?;
        let mut manifest = Manifest::load(ws.manifest_path()).map_err(to_io)?;
        manifest.record(package, hash.clone(), digest);
        manifest.save().map_err(to_io)
    }
}

impl Materializer for TreeMaterializer {
    fn materialize(&mut self, ws: &Workspace, package: &str, hash: &Hash) -> io::Result<()> {
        let dest = ws.package_dir(package);
        if dest.exists() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} is already materialized", package),
            ));
        }

        let staged = self.stage(&dest, hash)?;
        fs::rename(&staged, &dest)?;

        if let Err(e) = self.record(ws, package, hash, &dest) {
            warn!("Failed to record {} in manifest, removing tree", package);
            let _ = fs::remove_dir_all(&dest);
            return Err(e);
        }

        debug!("Materialized {} from {}", package, hash.short());
        Ok(())
    }

    fn rematerialize(&mut self, ws: &Workspace, package: &str, hash: &Hash) -> io::Result<()> {
        let dest = ws.package_dir(package);
        if !dest.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not materialized", package),
            ));
        }

        let staged = self.stage(&dest, hash)?;
        let parent = dest.parent().unwrap_or(ws.root());
        let old = parent.join(format!(".old-{}", Uuid::new_v4()));

        if let Err(e) = fs::rename(&dest, &old) {
            let _ = fs::remove_dir_all(&staged);
            return Err(e);
        }
        if let Err(e) = fs::rename(&staged, &dest) {
            // Put the previous tree back before reporting
            let _ = fs::rename(&old, &dest);
            let _ = fs::remove_dir_all(&staged);
            return Err(e);
        }

        if let Err(e) = self.record(ws, package, hash, &dest) {
            let _ = fs::remove_dir_all(&dest);
            let _ = fs::rename(&old, &dest);
            return Err(e);
        }

        if let Err(e) = fs::remove_dir_all(&old) {
            warn!("Could not clean up previous tree of {}: {}", package, e);
        }
        debug!("Rematerialized {} at {}", package, hash.short());
        Ok(())
    }

    fn dematerialize(&mut self, ws: &Workspace, package: &str) -> io::Result<()> {
        let dest = ws.package_dir(package);
        let mut manifest = Manifest::load(ws.manifest_path()).map_err(to_io)?;
        if !dest.exists() && manifest.get(package).is_none() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not materialized", package),
            ));
        }

        if dest.exists() {
            let parent = dest.parent().unwrap_or(ws.root());
            let trash = parent.join(format!(".trash-{}", Uuid::new_v4()));
            fs::rename(&dest, &trash)?;
            if let Err(e) = fs::remove_dir_all(&trash) {
                warn!("Could not delete old tree of {}: {}", package, e);
            }
        }

        manifest.forget(package);
        manifest.save().map_err(to_io)?;
        debug!("Dematerialized {}", package);
        Ok(())
    }
}
