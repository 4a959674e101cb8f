//! Transactional store adapters for the saga orchestrator.
//!
//! Two implementations of the `TransactionalStore` contract:
//! - [`PgStore`]: PostgreSQL over `sqlx`, one database transaction per unit
//!   of work
//! - [`MemoryStore`]: an in-process map with snapshot semantics, for tests
//!   and single-process embedding

mod memory;
mod postgres;

pub use memory::{MemoryStore, MemoryTransaction};
pub use postgres::PgStore;
