// src/lib.rs

//! Keel requirements reconciler
//!
//! Reconciles a declared set of package requirements against an
//! availability index and the packages materialized in a workspace, then
//! applies the resulting install/update/remove plan as one transaction.
//!
//! # Architecture
//!
//! - Constraint model: semantic versions and normalized version sets
//! - Query engine: effective requirements, pruned dependency graph, diff
//! - Resolver: bounded backtracking search with minimal conflict reports
//! - Cache gate: every needed artifact is local before anything changes
//! - Transactions: ordered apply with a compensation log and reverse rollback

pub mod cache;
mod error;
pub mod filesystem;
pub mod hash;
pub mod index;
pub mod query;
pub mod reconcile;
pub mod requirements;
pub mod resolver;
pub mod state;
pub mod transaction;
pub mod version;
pub mod workspace;

pub use cache::{ArtifactStorage, ArtifactStore, CacheGate, MirrorRemote, MissingArtifact, Remote, WorkingCopy};
pub use error::{Error, Result};
pub use filesystem::{Materializer, TreeMaterializer};
pub use hash::Hash;
pub use index::{ArtifactDescriptor, AvailabilityIndex, AvailabilitySource, IndexFile};
pub use query::{dependency_graph, diff, effective_requirements, Diff};
pub use reconcile::{reconcile_workspace, Outcome, Reconciler, RunOptions};
pub use requirements::{requirements_changed, RequirementSet, RequirementSource, TomlRequirements};
pub use resolver::{resolve, sanity_check, Conflict, Resolver, SanityIssue, SanityReport};
pub use state::{Assignment, InstalledProbe, InstalledState, Manifest, ManifestProbe};
pub use transaction::{ApplyReport, CompensationFailure, Plan, Transaction, TransactionState, WorkspaceLock};
pub use version::{Version, VersionSet};
pub use workspace::{PlatformPin, Settings, Workspace};
