//! Transactional store contract.

use async_trait::async_trait;
use saga_domain::StoreError;

/// A store exposing commit/rollback-bounded units of work.
///
/// The orchestrator owns the discipline: it begins a unit of work per step
/// or compensation, commits on success, and rolls back on error, so each
/// step's effect is durable before the next step reads it.
///
/// Implementations provide a `Handle` that operations use to reach the
/// underlying store (a `sqlx` transaction, an in-memory snapshot, ...).
#[async_trait]
pub trait TransactionalStore: Send + Sync {
    /// Handle passed to operations running inside a unit of work.
    type Handle: Send;

    /// Opens a new unit of work.
    ///
    /// # Errors
    /// Returns an error if the store cannot start a transaction.
    async fn begin(&self) -> Result<Self::Handle, StoreError>;

    /// Commits a unit of work, making its effects durable.
    ///
    /// # Errors
    /// Returns an error if the commit fails; the unit of work is consumed
    /// either way.
    async fn commit(&self, handle: Self::Handle) -> Result<(), StoreError>;

    /// Rolls back a unit of work, discarding its effects.
    ///
    /// # Errors
    /// Returns an error if the rollback fails; the unit of work is consumed
    /// either way.
    async fn rollback(&self, handle: Self::Handle) -> Result<(), StoreError>;
}
