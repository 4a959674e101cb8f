//! The saga orchestrator.

use std::future::Future;
use std::sync::Arc;

use saga_domain::{
    CompensationFailure, EventEnvelope, OrchestratorError, SagaRun, StoreError,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::cache::ResultCache;
use crate::config::OrchestratorConfig;
use crate::events::EventPublisher;
use crate::lock::{DistributedLock, LockBackend};
use crate::step::{Compensation, SagaStep};
use crate::store::TransactionalStore;

/// Coordinates multi-step operations that must appear atomic even though
/// they span independent units of work.
///
/// Steps execute strictly sequentially, each inside its own unit of work,
/// under a distributed lock scoped to the logical resource being protected.
/// On a step failure, compensations for the committed prefix run in reverse
/// order before the original error is returned. Callers receive either the
/// complete ordered results or a single error; never a partial success.
///
/// All collaborators are constructor-injected so tests can substitute fakes.
pub struct TransactionOrchestrator<S: TransactionalStore> {
    store: Arc<S>,
    lock: DistributedLock,
    cache: Arc<dyn ResultCache>,
    publisher: Arc<dyn EventPublisher>,
    config: OrchestratorConfig,
}

impl<S: TransactionalStore> TransactionOrchestrator<S> {
    /// Creates an orchestrator over the given collaborators.
    pub fn new(
        store: Arc<S>,
        lock_backend: Arc<dyn LockBackend>,
        cache: Arc<dyn ResultCache>,
        publisher: Arc<dyn EventPublisher>,
        config: OrchestratorConfig,
    ) -> Self {
        let lock = DistributedLock::new(lock_backend)
            .with_retry(config.lock_retry_attempts, config.lock_retry_delay);
        Self {
            store,
            lock,
            cache,
            publisher,
            config,
        }
    }

    /// Executes `steps` as one logical operation over the resource named by
    /// `resource`, compensating the committed prefix if any step fails.
    ///
    /// `resource` must be the protected resource's stable identity (a wallet
    /// address, a portfolio id); concurrent sagas over the same resource
    /// serialize on it. Deriving it from call-time entropy would give every
    /// caller a unique, never-colliding lock and defeat mutual exclusion.
    ///
    /// # Errors
    /// - [`OrchestratorError::Configuration`] when `steps` and
    ///   `compensations` differ in length; nothing has run.
    /// - [`OrchestratorError::LockAcquisition`] when the lock is contended
    ///   or the lock backend fails; nothing has run.
    /// - [`OrchestratorError::StepExecution`] when a step fails, after all
    ///   compensations for committed steps have been attempted.
    pub async fn execute_saga(
        &self,
        resource: &str,
        steps: &[Box<dyn SagaStep<S::Handle>>],
        compensations: &[Box<dyn Compensation<S::Handle>>],
    ) -> Result<Vec<Value>, OrchestratorError> {
        if steps.len() != compensations.len() {
            return Err(OrchestratorError::Configuration(format!(
                "steps and compensations must pair 1:1 ({} steps, {} compensations)",
                steps.len(),
                compensations.len()
            )));
        }

        let lock_key = format!("{}:{}", self.config.lock_key_prefix, resource);
        let mut run = SagaRun::new(lock_key.clone());

        let guard = match self.lock.acquire(&lock_key, self.config.lock_ttl).await {
            Ok(Some(guard)) => guard,
            Ok(None) => {
                info!(run_id = %run.id, key = %lock_key, "Saga lock contended, run not started");
                return Err(OrchestratorError::LockAcquisition {
                    key: lock_key,
                    source: None,
                });
            }
            Err(err) => {
                return Err(OrchestratorError::LockAcquisition {
                    key: lock_key,
                    source: Some(err),
                });
            }
        };

        run.mark_running();
        info!(
            run_id = %run.id,
            resource,
            steps = steps.len(),
            "Saga started"
        );

        let outcome = self.run_steps(&mut run, steps, compensations).await;

        // Cleanup happens on both branches before the caller sees the
        // outcome: staged entries first, then the lock.
        self.clear_staged(&run).await;
        if let Err(err) = guard.release().await {
            warn!(run_id = %run.id, error = %err, "Failed to release saga lock");
        }

        outcome
    }

    /// Runs a single operation inside one unit of work.
    ///
    /// A degenerate single-step saga: no locking, no compensation, no
    /// staging. The operation's result or error is propagated untouched.
    ///
    /// # Errors
    /// Returns [`OrchestratorError::Store`] with the operation's failure.
    pub async fn execute_transaction(
        &self,
        op: &dyn SagaStep<S::Handle>,
    ) -> Result<Value, OrchestratorError> {
        self.run_unit(op).await.map_err(OrchestratorError::Store)
    }

    /// Runs `op` to completion, then publishes an [`EventEnvelope`] carrying
    /// its result on the `event` channel.
    ///
    /// The write and the notification are decoupled: a publish failure is
    /// logged and never masks the result, and consumers must tolerate missed
    /// or duplicated envelopes.
    ///
    /// # Errors
    /// Propagates `op`'s error untouched.
    pub async fn execute_eventual_consistent<T, E, F, Fut>(
        &self,
        op: F,
        event: &str,
        metadata: Value,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: Serialize,
    {
        let result = op().await?;

        match serde_json::to_value(&result) {
            Ok(data) => {
                let envelope = EventEnvelope::new(event, data, metadata);
                match serde_json::to_value(&envelope) {
                    Ok(message) => {
                        if let Err(err) = self.publisher.publish(event, &message).await {
                            warn!(event, error = %err, "Event publication failed, result unaffected");
                        } else {
                            debug!(event, "Event published");
                        }
                    }
                    Err(err) => {
                        warn!(event, error = %err, "Could not serialize event envelope");
                    }
                }
            }
            Err(err) => {
                warn!(event, error = %err, "Could not serialize result for publication");
            }
        }

        Ok(result)
    }

    async fn run_steps(
        &self,
        run: &mut SagaRun,
        steps: &[Box<dyn SagaStep<S::Handle>>],
        compensations: &[Box<dyn Compensation<S::Handle>>],
    ) -> Result<Vec<Value>, OrchestratorError> {
        for (index, step) in steps.iter().enumerate() {
            match self.run_unit(step.as_ref()).await {
                Ok(value) => {
                    debug!(run_id = %run.id, index, step = step.name(), "Saga step committed");
                    self.stage_result(run, index, &value).await;
                    run.results.push(value);
                }
                Err(step_error) => {
                    error!(
                        run_id = %run.id,
                        index,
                        step = step.name(),
                        error = %step_error,
                        "Saga step failed, compensating committed steps"
                    );
                    run.mark_compensating();
                    let failures = self.compensate(run, compensations).await;
                    if !failures.is_empty() {
                        warn!(
                            run_id = %run.id,
                            uncompensated = failures.len(),
                            "Run left under-compensated, manual reconciliation required"
                        );
                    }
                    run.mark_failed(step_error.to_string());
                    return Err(OrchestratorError::StepExecution {
                        index,
                        step: step.name().to_string(),
                        partial_results: run.results.clone(),
                        source: step_error,
                    });
                }
            }
        }

        run.mark_completed();
        info!(run_id = %run.id, results = run.results.len(), "Saga completed");
        Ok(run.results.clone())
    }

    /// Applies compensations for every committed step, newest first.
    ///
    /// Failures are collected, not propagated: a failing compensation never
    /// interrupts the remaining sequence and never replaces the step error.
    async fn compensate(
        &self,
        run: &SagaRun,
        compensations: &[Box<dyn Compensation<S::Handle>>],
    ) -> Vec<CompensationFailure> {
        let mut failures = Vec::new();

        for index in (0..run.committed_steps()).rev() {
            let compensation = &compensations[index];
            match self.run_compensation(compensation.as_ref(), &run.results[index]).await {
                Ok(()) => {
                    info!(
                        run_id = %run.id,
                        index,
                        compensation = compensation.name(),
                        "Compensation applied"
                    );
                }
                Err(err) => {
                    warn!(
                        run_id = %run.id,
                        index,
                        compensation = compensation.name(),
                        error = %err,
                        "Compensation failed, continuing with remaining compensations"
                    );
                    failures.push(CompensationFailure {
                        index,
                        step: compensation.name().to_string(),
                        error: err.to_string(),
                    });
                }
            }
        }

        failures
    }

    /// One unit of work: begin, execute, commit on success, roll back on
    /// error.
    async fn run_unit(&self, op: &dyn SagaStep<S::Handle>) -> Result<Value, StoreError> {
        let mut tx = self.store.begin().await?;
        match op.execute(&mut tx).await {
            Ok(value) => {
                self.store.commit(tx).await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.store.rollback(tx).await {
                    warn!(error = %rollback_err, "Rollback failed after step error");
                }
                Err(err)
            }
        }
    }

    async fn run_compensation(
        &self,
        compensation: &dyn Compensation<S::Handle>,
        output: &Value,
    ) -> Result<(), StoreError> {
        let mut tx = self.store.begin().await?;
        match compensation.compensate(output, &mut tx).await {
            Ok(()) => self.store.commit(tx).await,
            Err(err) => {
                if let Err(rollback_err) = self.store.rollback(tx).await {
                    warn!(error = %rollback_err, "Rollback failed after compensation error");
                }
                Err(err)
            }
        }
    }

    fn stage_key(&self, run: &SagaRun, index: usize) -> String {
        format!("{}:{}:{}", self.config.stage_key_prefix, run.id, index)
    }

    /// Stages a committed step result for operational inspection. Staging is
    /// observability only, so failures are logged and swallowed.
    async fn stage_result(&self, run: &SagaRun, index: usize, value: &Value) {
        let key = self.stage_key(run, index);
        if let Err(err) = self
            .cache
            .put(&key, value, Some(self.config.stage_ttl))
            .await
        {
            warn!(run_id = %run.id, index, error = %err, "Failed to stage step result");
        }
    }

    async fn clear_staged(&self, run: &SagaRun) {
        for index in 0..run.committed_steps() {
            let key = self.stage_key(run, index);
            if let Err(err) = self.cache.delete(&key).await {
                warn!(run_id = %run.id, index, error = %err, "Failed to clear staged result");
            }
        }
    }
}
