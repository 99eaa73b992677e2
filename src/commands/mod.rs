// src/commands/mod.rs
//! Command handlers for the keel CLI

mod check;
mod hold;
mod init;
mod require;
mod status;
mod sync;

pub use check::cmd_check;
pub use hold::cmd_hold;
pub use init::cmd_init;
pub use require::{cmd_add, cmd_remove};
pub use status::cmd_status;
pub use sync::{cmd_sync, cmd_update};

use anyhow::{Context, Result};
use keel::{Outcome, RequirementSet, RequirementSource, TomlRequirements, Workspace};
use std::path::Path;

/// Open the workspace rooted at `path`
pub(crate) fn open_workspace(path: &Path) -> Result<Workspace> {
    Workspace::open(path).with_context(|| format!("Failed to open workspace {}", path.display()))
}

/// Current `keel.toml` text, a source that preserves it, and its parsed requirements
pub(crate) fn load_requirements(ws: &Workspace) -> Result<(String, TomlRequirements, RequirementSet)> {
    let text = ws.read_config_text()?;
    let source = TomlRequirements::with_document(&text)
        .with_context(|| format!("Failed to parse {}", ws.config_path().display()))?;
    let reqs = source.parse(&text)?;
    Ok((text, source, reqs))
}

/// Print what a run did
pub(crate) fn print_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::NothingToDo => println!("Workspace is up to date"),
        Outcome::Planned(plan) => {
            println!("Would apply {} actions:", plan.len());
            for action in plan.actions() {
                println!("  {}", action);
            }
        }
        Outcome::Applied(report) => {
            for line in &report.applied {
                println!("  {}", line);
            }
            println!(
                "Applied {} actions in {}ms (transaction {})",
                report.applied.len(),
                report.elapsed().num_milliseconds(),
                report.transaction_id
            );
        }
    }
}
