//! Error taxonomy for the orchestrator and its collaborator contracts.
//!
//! Callers only ever see a single error per invocation: the configuration
//! error, the lock-acquisition failure, or the original step error wrapped
//! with its index and partial results. Compensation failures are recorded
//! and logged but never replace the root cause.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Failures from the transactional store adapter.
///
/// Adapters wrap their backend error in the variant matching the unit-of-work
/// phase that failed; step and compensation bodies use `Operation`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not open a unit of work.
    #[error("failed to begin unit of work")]
    Begin(#[source] anyhow::Error),
    /// The store could not commit a unit of work.
    #[error("failed to commit unit of work")]
    Commit(#[source] anyhow::Error),
    /// The store could not roll back a unit of work.
    #[error("failed to roll back unit of work")]
    Rollback(#[source] anyhow::Error),
    /// The operation running inside the unit of work failed.
    #[error("{0}")]
    Operation(#[from] anyhow::Error),
}

/// Failures from the distributed lock backend.
#[derive(Debug, Error)]
pub enum LockError {
    /// The lock backend could not be reached or rejected the command.
    #[error("lock backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Failures from the result cache backend.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache backend could not be reached or rejected the command.
    #[error("cache backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Failures from the event publisher backend.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The publisher backend could not be reached or rejected the message.
    #[error("publish failed: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Record of a single failed compensation.
///
/// Never surfaced as the call's error. Collected so the failure can be
/// logged with enough context for manual reconciliation; the original step
/// error is what the caller receives.
#[derive(Debug, Clone, Serialize)]
pub struct CompensationFailure {
    /// Index of the step whose compensation failed.
    pub index: usize,
    /// Name of the failing compensation.
    pub step: String,
    /// Rendered error message.
    pub error: String,
}

/// Errors surfaced by the orchestrator to its callers.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Malformed step/compensation arrays. Raised before any side effect.
    #[error("saga configuration invalid: {0}")]
    Configuration(String),

    /// The distributed lock was not obtained. No steps ran; safe to retry.
    #[error("could not acquire lock `{key}`")]
    LockAcquisition {
        /// The lock key that was contended or unreachable.
        key: String,
        /// Backend failure, when acquisition failed for a reason other than
        /// contention.
        #[source]
        source: Option<LockError>,
    },

    /// A step failed mid-saga. Compensations for all committed steps have
    /// been attempted before this is returned.
    #[error("saga step `{step}` (index {index}) failed")]
    StepExecution {
        /// Zero-based index of the failing step.
        index: usize,
        /// Name of the failing step.
        step: String,
        /// Results of the steps that committed before the failure, kept for
        /// diagnostics. Never handed to callers as a success value.
        partial_results: Vec<Value>,
        /// The original step error.
        #[source]
        source: StoreError,
    },

    /// Passthrough store failure from the single-operation transaction path.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl OrchestratorError {
    /// Index of the failing step, when this error came from a saga step.
    #[must_use]
    pub fn failed_index(&self) -> Option<usize> {
        match self {
            OrchestratorError::StepExecution { index, .. } => Some(*index),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_step_execution_preserves_cause() {
        let err = OrchestratorError::StepExecution {
            index: 1,
            step: "broadcast_trade".to_string(),
            partial_results: vec![serde_json::json!(5)],
            source: StoreError::Operation(anyhow::anyhow!("X")),
        };

        assert_eq!(err.failed_index(), Some(1));
        let cause = err.source().expect("step error carries a source");
        assert_eq!(cause.to_string(), "X");
    }

    #[test]
    fn test_lock_acquisition_display() {
        let err = OrchestratorError::LockAcquisition {
            key: "saga:lock:portfolio:42".to_string(),
            source: None,
        };
        assert_eq!(
            err.to_string(),
            "could not acquire lock `saga:lock:portfolio:42`"
        );
    }
}
