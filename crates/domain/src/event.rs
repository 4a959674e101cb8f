//! Event envelopes for eventually-consistent notification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message published after an eventually-consistent operation completes.
///
/// Delivery is best-effort: consumers must tolerate missed or duplicated
/// envelopes and consume idempotently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Channel-scoped event name.
    pub event: String,
    /// Serialized result of the operation that triggered the event.
    pub data: Value,
    /// Caller-supplied metadata, passed through untouched.
    pub metadata: Value,
    /// When the envelope was built.
    pub timestamp: DateTime<Utc>,
}

impl EventEnvelope {
    /// Creates a new envelope stamped with the current time.
    #[must_use]
    pub fn new(event: impl Into<String>, data: Value, metadata: Value) -> Self {
        Self {
            event: event.into(),
            data,
            metadata,
            timestamp: Utc::now(),
        }
    }
}
