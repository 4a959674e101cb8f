//! Event publisher contract for decoupled notification.
//!
//! Publication is fire-and-forget: delivery is best-effort and not
//! exactly-once, so consumers must be idempotent. The orchestrator never
//! fails an operation because its notification could not be published.

mod memory;

pub use memory::*;

use async_trait::async_trait;
use saga_domain::PublishError;
use serde_json::Value;

/// Best-effort channel publisher.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes `message` on `channel`.
    ///
    /// # Errors
    /// Returns an error if the backend rejects the message; callers treat
    /// this as a logged, non-fatal condition.
    async fn publish(&self, channel: &str, message: &Value) -> Result<(), PublishError>;
}
