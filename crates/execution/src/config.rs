//! Orchestrator configuration.

use std::time::Duration;

/// Configuration for the transaction orchestrator.
///
/// Supplied by the host application; the orchestrator owns no CLI, file
/// format, or environment schema.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Lease duration for the run's distributed lock. The heartbeat renews
    /// the lease while the run is alive, so this bounds how long a crashed
    /// coordinator can block other callers.
    pub lock_ttl: Duration,
    /// Additional acquisition attempts after the first one fails on
    /// contention.
    pub lock_retry_attempts: u32,
    /// Delay between acquisition attempts.
    pub lock_retry_delay: Duration,
    /// Prefix for lock keys; the caller's resource identity is appended.
    pub lock_key_prefix: String,
    /// Prefix for staged-result cache keys.
    pub stage_key_prefix: String,
    /// Time-to-live for staged step results.
    pub stage_ttl: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            lock_ttl: Duration::from_secs(30),
            lock_retry_attempts: 0, // fail fast on contention
            lock_retry_delay: Duration::from_millis(250),
            lock_key_prefix: "saga:lock".to_string(),
            stage_key_prefix: "saga:stage".to_string(),
            stage_ttl: Duration::from_secs(3600), // 1 hour
        }
    }
}
