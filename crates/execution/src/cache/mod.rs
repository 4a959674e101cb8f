//! Result cache contract for staging step results.
//!
//! Staged entries exist for observability and external inspection only;
//! they are never the source of truth for saga correctness, and every cache
//! failure is isolated from the saga outcome.

mod memory;

pub use memory::*;

use std::time::Duration;

use async_trait::async_trait;
use saga_domain::CacheError;
use serde_json::Value;

/// TTL-bearing key-value store for staged saga results.
#[async_trait]
pub trait ResultCache: Send + Sync {
    /// Stores `value` under `key`, expiring after `ttl` when given.
    ///
    /// # Errors
    /// Returns an error if the backend is unreachable.
    async fn put(&self, key: &str, value: &Value, ttl: Option<Duration>) -> Result<(), CacheError>;

    /// Fetches the value under `key`, if present and unexpired.
    ///
    /// # Errors
    /// Returns an error if the backend is unreachable.
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;

    /// Removes the value under `key`. Removing a missing key is not an
    /// error.
    ///
    /// # Errors
    /// Returns an error if the backend is unreachable.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}
