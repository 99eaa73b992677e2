// src/transaction/mod.rs

//! Transactional applier
//!
//! A transaction takes a [`Plan`] through a fixed lifecycle. Every applied
//! action is logged together with its compensation; on failure the log is
//! replayed backwards so the workspace returns to what it held before.
//!
//! # Transaction Lifecycle
//!
//! ```text
//! PLANNING -> PREFETCHING -> APPLYING -> COMMITTED
//!                  |             |
//!                  v             v
//!               ABORTED <- ROLLING_BACK
//! ```
//!
//! No state is revisited. Applying is only reachable through a successful
//! prefetch, so nothing is mutated while an artifact is still missing.

mod lock;
mod plan;

pub use lock::WorkspaceLock;
pub use plan::{Action, Compensation, Plan};

use crate::cache::CacheGate;
use crate::error::{Error, Result};
use crate::filesystem::Materializer;
use crate::index::AvailabilitySource;
use crate::workspace::Workspace;
use chrono::{DateTime, Utc};
use std::fmt;
use std::io;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Transaction state machine phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Plan computed, nothing touched
    Planning,
    /// Making every needed artifact local
    Prefetching,
    /// Mutating the workspace
    Applying,
    /// Undoing applied actions after a failure
    RollingBack,
    /// All actions applied, log discarded
    Committed,
    /// Stopped before completion
    Aborted,
}

impl TransactionState {
    /// Whether `next` may follow this state
    pub fn can_transition_to(self, next: TransactionState) -> bool {
        use TransactionState::*;
        matches!(
            (self, next),
            (Planning, Prefetching)
                | (Prefetching, Applying)
                | (Prefetching, Aborted)
                | (Applying, Committed)
                | (Applying, RollingBack)
                | (RollingBack, Aborted)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::Aborted)
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Planning => "planning",
            Self::Prefetching => "prefetching",
            Self::Applying => "applying",
            Self::RollingBack => "rolling back",
            Self::Committed => "committed",
            Self::Aborted => "aborted",
        };
        write!(f, "{}", name)
    }
}

/// A compensation that could not be carried out during rollback
#[derive(Debug)]
pub struct CompensationFailure {
    pub compensation: Compensation,
    pub error: io::Error,
}

impl fmt::Display for CompensationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.compensation, self.error)
    }
}

/// Itemized result of a committed transaction
#[derive(Debug, Clone)]
pub struct ApplyReport {
    pub transaction_id: Uuid,
    /// One line per applied action, in order
    pub applied: Vec<String>,
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
}

impl ApplyReport {
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished - self.started
    }
}

impl fmt::Display for ApplyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.applied {
            writeln!(f, "{}", line)?;
        }
        write!(
            f,
            "transaction {} committed {} actions in {}ms",
            self.transaction_id,
            self.applied.len(),
            self.elapsed().num_milliseconds()
        )
    }
}

/// One run of a plan against a workspace
pub struct Transaction {
    id: Uuid,
    state: TransactionState,
    plan: Plan,
    log: Vec<Compensation>,
    started: DateTime<Utc>,
}

impl Transaction {
    /// Start a transaction in the planning state
    pub fn begin(plan: Plan) -> Self {
        let id = Uuid::new_v4();
        debug!("[{}] begin with {} actions", id, plan.len());
        Self {
            id,
            state: TransactionState::Planning,
            plan,
            log: Vec::new(),
            started: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    fn transition(&mut self, next: TransactionState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(Error::TransactionError(format!(
                "cannot move from {} to {}",
                self.state, next
            )));
        }
        debug!("[{}] {} -> {}", self.id, self.state, next);
        self.state = next;
        Ok(())
    }

    /// Make every artifact the plan (or its rollback) needs local
    ///
    /// On failure the transaction is aborted without having touched the
    /// workspace.
    pub fn prefetch(&mut self, gate: &CacheGate<'_>, source: &dyn AvailabilitySource) -> Result<()> {
        self.transition(TransactionState::Prefetching)?;
        if let Err(e) = gate.ensure_plan(&self.plan, source) {
            warn!("[{}] prefetch failed, nothing was changed", self.id);
            self.transition(TransactionState::Aborted)?;
            return Err(e);
        }
        Ok(())
    }

    /// Apply every action in order, rolling back on the first failure
    pub fn apply(mut self, ws: &Workspace, materializer: &mut dyn Materializer) -> Result<ApplyReport> {
        self.transition(TransactionState::Applying)?;

        let actions = self.plan.actions().to_vec();
        let mut applied = Vec::with_capacity(actions.len());

        for action in &actions {
            match action.run(ws, materializer) {
                Ok(()) => {
                    info!("[{}] {}", self.id, action);
                    self.log.push(action.compensation());
                    applied.push(action.to_string());
                }
                Err(cause) => {
                    error!("[{}] {} failed: {}", self.id, action, cause);
                    self.transition(TransactionState::RollingBack)?;
                    let rollback_failures = self.rollback(ws, materializer);
                    self.transition(TransactionState::Aborted)?;
                    return Err(Error::ApplyFailure {
                        step: action.to_string(),
                        cause,
                        rollback_failures,
                    });
                }
            }
        }

        self.transition(TransactionState::Committed)?;
        self.log.clear();

        let report = ApplyReport {
            transaction_id: self.id,
            applied,
            started: self.started,
            finished: Utc::now(),
        };
        info!("[{}] committed in {}ms", self.id, report.elapsed().num_milliseconds());
        Ok(report)
    }

    /// Run the compensation log newest first, collecting failures
    fn rollback(&mut self, ws: &Workspace, materializer: &mut dyn Materializer) -> Vec<CompensationFailure> {
        let mut failures = Vec::new();

        while let Some(compensation) = self.log.pop() {
            match compensation.run(ws, materializer) {
                Ok(()) => info!("[{}] rolled back: {}", self.id, compensation),
                Err(error) => {
                    error!("[{}] rollback step {} failed: {}", self.id, compensation, error);
                    failures.push(CompensationFailure { compensation, error });
                }
            }
        }

        if failures.is_empty() {
            info!("[{}] rollback complete", self.id);
        }
        failures
    }
}
