// src/filesystem/mod.rs

//! Filesystem mutation for keel
//!
//! This module provides:
//! - The [`Materializer`] seam the transactional applier drives
//! - [`TreeMaterializer`], which deploys artifact trees from the store into
//!   the workspace
//! - Tree copying shared with the artifact store
//! - Package name checks for names that become directory names

mod path;
mod tree;

pub use path::validate_package_name;
pub use tree::TreeMaterializer;

use crate::hash::Hash;
use crate::workspace::Workspace;
use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// Filesystem mutation (external collaborator)
///
/// Every operation receives the workspace explicitly and either completes
/// or fails with an I/O error.
pub trait Materializer {
    /// Create the working copy of `package` from artifact `hash`
    fn materialize(&mut self, ws: &Workspace, package: &str, hash: &Hash) -> io::Result<()>;

    /// Replace the existing working copy of `package` with artifact `hash`
    fn rematerialize(&mut self, ws: &Workspace, package: &str, hash: &Hash) -> io::Result<()>;

    /// Delete the working copy of `package`
    fn dematerialize(&mut self, ws: &Workspace, package: &str) -> io::Result<()>;
}

/// Recursively copy `src` to a new directory `dest`
///
/// Symlinks are recreated, not followed. `dest` must not exist.
pub(crate) fn copy_tree(src: &Path, dest: &Path) -> io::Result<()> {
    if !src.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("source tree {} does not exist", src.display()),
        ));
    }
    fs::create_dir(dest)?;

    for entry in WalkDir::new(src).min_depth(1).follow_links(false) {
        let entry = entry?;
        let rel = entry.path().strip_prefix(src).map_err(io::Error::other)?;
        let target = dest.join(rel);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            let link = fs::read_link(entry.path())?;
            #[cfg(unix)]
            std::os::unix::fs::symlink(&link, &target)?;
            #[cfg(not(unix))]
            fs::write(&target, format!("SYMLINK:{}", link.display()))?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
