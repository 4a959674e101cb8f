//! Saga step and compensation contracts.
//!
//! Steps and compensations are named value types rather than anonymous
//! closures, so each operation can be unit-tested on its own and saga
//! definitions stay inspectable. Position is significant: the compensation
//! at index `i` reverses the step at index `i`.

use async_trait::async_trait;
use saga_domain::StoreError;
use serde_json::Value;

/// One forward operation in a saga.
///
/// A step's only allowed side effects are through the unit-of-work handle it
/// receives or the external calls it makes. Its returned value becomes part
/// of the run's ordered results and is handed to the paired compensation if
/// a later step fails.
#[async_trait]
pub trait SagaStep<H: Send>: Send + Sync {
    /// Name used in logs and error context.
    fn name(&self) -> &str;

    /// Executes the step inside an open unit of work.
    ///
    /// # Errors
    /// Returns an error if the step fails; the orchestrator rolls back the
    /// unit of work and starts compensating.
    async fn execute(&self, tx: &mut H) -> Result<Value, StoreError>;
}

/// Semantic reversal of a previously committed step.
///
/// Receives the committed result of the step at the same index. Reversal is
/// application-defined: it restores the prior state's meaning, not
/// necessarily its bytes, and reversing an already-broadcast external side
/// effect may be impossible.
#[async_trait]
pub trait Compensation<H: Send>: Send + Sync {
    /// Name used in logs and failure records.
    fn name(&self) -> &str;

    /// Applies the compensation inside an open unit of work.
    ///
    /// # Errors
    /// Returns an error if the compensation fails. The orchestrator logs the
    /// failure and continues with the remaining compensations; it never
    /// replaces the original step error.
    async fn compensate(&self, output: &Value, tx: &mut H) -> Result<(), StoreError>;
}
