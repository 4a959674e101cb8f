//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types from the crate.
//!
//! # Example
//!
//! ```rust
//! use saga_execution::prelude::*;
//! ```

// Cache
pub use crate::cache::{MemoryResultCache, ResultCache};

// Config
pub use crate::config::OrchestratorConfig;

// Events
pub use crate::events::{EventPublisher, MemoryPublisher};

// Lock
pub use crate::lock::{DistributedLock, LockBackend, LockGuard, MemoryLockBackend};

// Orchestrator
pub use crate::orchestrator::TransactionOrchestrator;

// Step
pub use crate::step::{Compensation, SagaStep};

// Store
pub use crate::store::TransactionalStore;

// Domain
pub use saga_domain::{
    CacheError, CompensationFailure, EventEnvelope, LockError, OrchestratorError, PublishError,
    RunStatus, SagaRun, StoreError,
};
