// src/error.rs

use crate::cache::MissingArtifact;
use crate::resolver::Conflict;
use crate::transaction::CompensationFailure;
use thiserror::Error;

/// Core error types for keel
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors for the index and state manifest
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed `keel.toml`
    #[error("Failed to parse configuration: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to render `keel.toml`
    #[error("Failed to write configuration: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    /// Version string could not be parsed
    #[error("Invalid version '{input}': {reason}")]
    InvalidVersion { input: String, reason: String },

    /// Constraint string could not be parsed
    #[error("Invalid version constraint '{0}'")]
    InvalidConstraint(String),

    /// Content hash was not a hex object id
    #[error("Invalid content hash '{0}'")]
    InvalidHash(String),

    /// Package name that cannot be used as a workspace directory name
    #[error("Invalid package name '{0}'")]
    InvalidPackageName(String),

    /// Configuration is structurally valid but unusable
    #[error("Configuration error: {0}")]
    Config(String),

    /// A requirement names a package nobody knows about
    #[error("Unknown package '{0}'")]
    UnknownPackage(String),

    /// A fixed package's pinned version contradicts a declared requirement
    #[error("Requirement on '{package}' excludes its fixed version {version}")]
    ConflictingFixedRequirement { package: String, version: String },

    /// No assignment satisfies the requirements
    #[error("Unsatisfiable requirements:\n{0}")]
    UnsatisfiableRequirements(Box<Conflict>),

    /// Resolver gave up before finishing its search
    #[error("Dependency resolution exceeded its budget of {0} steps")]
    ResolutionBudgetExceeded(usize),

    /// Prefetch gate found hashes it could not obtain; nothing was mutated
    #[error("Missing artifacts: {}", format_missing(.0))]
    MissingArtifacts(Vec<MissingArtifact>),

    /// A mutation step failed; the transaction was rolled back
    #[error("{step} failed: {cause}{}", format_rollback(.rollback_failures))]
    ApplyFailure {
        step: String,
        #[source]
        cause: std::io::Error,
        rollback_failures: Vec<CompensationFailure>,
    },

    /// Workspace lock could not be acquired
    #[error("Failed to lock workspace: {0}")]
    Lock(String),

    /// Illegal transaction state transition
    #[error("Transaction error: {0}")]
    TransactionError(String),
}

fn format_missing(missing: &[MissingArtifact]) -> String {
    missing
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_rollback(failures: &[CompensationFailure]) -> String {
    if failures.is_empty() {
        return String::new();
    }
    let mut out = String::from(
        "\nRollback was incomplete; the workspace may match neither the previous nor the desired state:",
    );
    for failure in failures {
        out.push_str(&format!("\n  - {}", failure));
    }
    out
}

impl Error {
    /// True when the rollback after an apply failure did not fully restore the workspace
    pub fn rollback_incomplete(&self) -> bool {
        matches!(self, Error::ApplyFailure { rollback_failures, .. } if !rollback_failures.is_empty())
    }
}

/// Result type alias using keel's Error type
pub type Result<T> = std::result::Result<T, Error>;
