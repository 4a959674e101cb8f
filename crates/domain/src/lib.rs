//! Domain model for the saga transaction orchestrator.
//!
//! This crate defines the data types shared by the orchestrator and its
//! collaborators:
//! - Saga run records and their status state machine
//! - The error taxonomy surfaced to callers
//! - Event envelopes published for eventually-consistent consumers

pub mod error;
pub mod event;
pub mod run;

pub use error::{
    CacheError, CompensationFailure, LockError, OrchestratorError, PublishError, StoreError,
};
pub use event::EventEnvelope;
pub use run::{RunStatus, SagaRun};
