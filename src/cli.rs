// src/cli.rs
//! CLI definitions for keel
//!
//! This module contains all command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "keel")]
#[command(author = "Keel Contributors")]
#[command(version)]
#[command(about = "Reconcile declared package requirements with a workspace", long_about = None)]
pub struct Cli {
    /// Workspace directory
    #[arg(short, long, global = true, default_value = ".")]
    pub workspace: PathBuf,

    /// Show debug output (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create keel.toml and the state directory
    Init {
        /// Availability index file
        #[arg(long)]
        index: Option<PathBuf>,

        /// Artifact mirror root
        #[arg(long)]
        mirror: Option<PathBuf>,
    },

    /// Require a package and sync
    Add {
        /// Package name
        package: String,

        /// Version constraint (e.g. "^1.2", ">= 2.0, < 3.0"); any version if omitted
        constraint: Option<String>,

        /// Show what would change without changing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Stop requiring a package and sync
    Remove {
        /// Package name
        package: String,

        /// Show what would change without changing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Resolve requirements and apply the result
    Sync {
        /// Show the plan without prefetching or changing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Refresh the availability index, then sync
    Update {
        /// Index file to refresh from (defaults to settings.index_source)
        #[arg(long)]
        from: Option<PathBuf>,

        /// Refresh the index but only show the plan for the workspace
        #[arg(long)]
        dry_run: bool,
    },

    /// Check that every indexed version is installable
    Check,

    /// Show materialized packages and whether they may move
    Status,

    /// Keep a materialized package at its current version
    Hold {
        /// Package name
        package: String,
    },

    /// Let the resolver move a held package again
    Release {
        /// Package name
        package: String,
    },
}
