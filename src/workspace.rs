// src/workspace.rs

//! Workspace context and configuration
//!
//! A [`Workspace`] names the directory a reconciliation run operates on. It is
//! passed explicitly to every component that touches the filesystem; nothing
//! in keel changes the process working directory.
//!
//! # Layout
//!
//! ```text
//! <root>/keel.toml          settings + requirements
//! <root>/.keel/lock         exclusive run lock
//! <root>/.keel/objects/     artifact store
//! <root>/.keel/state.json   installed manifest
//! <root>/<packages_dir>/    materialized package trees
//! ```

use crate::error::{Error, Result};
use crate::version::Version;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the workspace configuration file
pub const CONFIG_FILE: &str = "keel.toml";

/// Name of the workspace state directory
pub const STATE_DIR: &str = ".keel";

/// Default resolver step budget
pub const DEFAULT_MAX_RESOLVER_STEPS: usize = 100_000;

/// A package held at a fixed version regardless of the index (e.g. the host platform)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformPin {
    pub name: String,
    pub version: Version,
}

/// The `[settings]` table of `keel.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Availability index file
    #[serde(default = "default_index")]
    pub index: PathBuf,

    /// Where `keel update` refreshes the index from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_source: Option<PathBuf>,

    /// Root of the artifact mirror
    #[serde(default = "default_mirror")]
    pub mirror: PathBuf,

    /// Directory (relative to the root) holding materialized packages
    #[serde(default = "default_packages_dir")]
    pub packages_dir: PathBuf,

    /// Resolver search budget
    #[serde(default = "default_max_resolver_steps")]
    pub max_resolver_steps: usize,

    /// Platform package treated as fixed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<PlatformPin>,
}

fn default_index() -> PathBuf {
    PathBuf::from(STATE_DIR).join("index.json")
}

fn default_mirror() -> PathBuf {
    PathBuf::from("mirror")
}

fn default_packages_dir() -> PathBuf {
    PathBuf::from("pkgs")
}

fn default_max_resolver_steps() -> usize {
    DEFAULT_MAX_RESOLVER_STEPS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            index: default_index(),
            index_source: None,
            mirror: default_mirror(),
            packages_dir: default_packages_dir(),
            max_resolver_steps: default_max_resolver_steps(),
            platform: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    settings: Settings,
}

/// Explicit context for one workspace
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    settings: Settings,
}

impl Workspace {
    /// Create a workspace context without reading any file
    pub fn new<P: AsRef<Path>>(root: P, settings: Settings) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            settings,
        }
    }

    /// Open an existing workspace by reading its `keel.toml`
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        let config_path = root.join(CONFIG_FILE);
        if !config_path.exists() {
            return Err(Error::Config(format!(
                "{} is not a keel workspace (no {})",
                root.display(),
                CONFIG_FILE
            )));
        }
        let text = fs::read_to_string(&config_path)?;
        let doc: ConfigDocument = toml::from_str(&text)?;
        if doc.settings.max_resolver_steps == 0 {
            return Err(Error::Config("max_resolver_steps must be positive".to_string()));
        }
        Ok(Self::new(root, doc.settings))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root.join(STATE_DIR)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.state_dir().join("lock")
    }

    pub fn objects_dir(&self) -> PathBuf {
        self.state_dir().join("objects")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.state_dir().join("state.json")
    }

    pub fn index_path(&self) -> PathBuf {
        self.resolve_path(&self.settings.index)
    }

    pub fn index_source(&self) -> Option<PathBuf> {
        self.settings.index_source.as_deref().map(|p| self.resolve_path(p))
    }

    pub fn mirror_path(&self) -> PathBuf {
        self.resolve_path(&self.settings.mirror)
    }

    pub fn packages_dir(&self) -> PathBuf {
        self.resolve_path(&self.settings.packages_dir)
    }

    /// Directory a package is materialized into
    pub fn package_dir(&self, package: &str) -> PathBuf {
        self.packages_dir().join(package)
    }

    /// Read `keel.toml` as text (empty if absent)
    pub fn read_config_text(&self) -> Result<String> {
        let path = self.config_path();
        if !path.exists() {
            return Ok(String::new());
        }
        Ok(fs::read_to_string(path)?)
    }

    /// Replace `keel.toml` (temp file + rename)
    pub fn write_config_text(&self, text: &str) -> Result<()> {
        let path = self.config_path();
        let temp = path.with_extension("toml.tmp");
        fs::write(&temp, text)?;
        fs::rename(&temp, &path)?;
        Ok(())
    }
}
