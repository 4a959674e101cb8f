//! Saga run records and their status state machine.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// Status of a saga run.
///
/// `Pending` and `Running` are transient; `Completed` and `Failed` are
/// terminal. `Pending` is also terminal when lock acquisition fails, since
/// no transition into `Running` ever occurs for that run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    /// Run created, lock not yet acquired.
    Pending,
    /// Lock held, steps executing.
    Running,
    /// A step failed; compensations are being applied in reverse order.
    Compensating,
    /// All steps committed.
    Completed,
    /// A step failed and compensations have been attempted.
    Failed,
}

impl RunStatus {
    /// Returns true for states a run can never leave.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }
}

/// Ephemeral in-process record of a single saga execution.
///
/// A run is created per orchestrator invocation, lives only for the duration
/// of that call, and is discarded after a terminal state is reached. There is
/// no persisted saga ledger.
#[derive(Debug, Clone, Serialize)]
pub struct SagaRun {
    /// Unique identifier for this run.
    pub id: Uuid,
    /// Lock key protecting the run's logical resource.
    pub lock_key: String,
    /// Current status.
    pub status: RunStatus,
    /// Results of steps that have successfully committed, in step order.
    ///
    /// Invariant: `results.len()` equals the number of committed steps, so
    /// compensations apply exactly to indices `[results.len()-1 ..= 0]`.
    pub results: Vec<Value>,
    /// When the run was created.
    pub started_at: DateTime<Utc>,
    /// When the run reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
    /// Message of the step error that failed the run, if any.
    pub last_error: Option<String>,
}

impl SagaRun {
    /// Creates a new run in `Pending` state.
    #[must_use]
    pub fn new(lock_key: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            lock_key: lock_key.into(),
            status: RunStatus::Pending,
            results: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
            last_error: None,
        }
    }

    /// Number of steps that have committed so far.
    #[must_use]
    pub fn committed_steps(&self) -> usize {
        self.results.len()
    }

    /// Marks the run as executing steps. Called once the lock is held.
    pub fn mark_running(&mut self) {
        self.status = RunStatus::Running;
    }

    /// Marks the run as compensating after a step failure.
    pub fn mark_compensating(&mut self) {
        self.status = RunStatus::Compensating;
    }

    /// Marks the run as completed.
    pub fn mark_completed(&mut self) {
        self.status = RunStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    /// Marks the run as failed, recording the originating error message.
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = RunStatus::Failed;
        self.completed_at = Some(Utc::now());
        self.last_error = Some(error.into());
    }
}
