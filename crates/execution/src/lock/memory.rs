//! In-process lock backend.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use saga_domain::LockError;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::LockBackend;

struct LockEntry {
    token: String,
    expires_at: Instant,
}

/// Lock backend over an in-process map.
///
/// Atomicity comes from holding the map mutex for the whole check-and-set.
/// Suitable for single-process deployments and tests; cross-process mutual
/// exclusion needs a shared backend.
#[derive(Default)]
pub struct MemoryLockBackend {
    entries: Mutex<HashMap<String, LockEntry>>,
}

impl MemoryLockBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LockBackend for MemoryLockBackend {
    async fn try_set(&self, key: &str, token: &str, ttl: Duration) -> Result<bool, LockError> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        if let Some(entry) = entries.get(key)
            && entry.expires_at > now
        {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            LockEntry {
                token: token.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(true)
    }

    async fn release_if_owner(&self, key: &str, token: &str) -> Result<bool, LockError> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if entry.token == token && entry.expires_at > now => {
                entries.remove(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn refresh_if_owner(
        &self,
        key: &str,
        token: &str,
        ttl: Duration,
    ) -> Result<bool, LockError> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        match entries.get_mut(key) {
            Some(entry) if entry.token == token && entry.expires_at > now => {
                entry.expires_at = now + ttl;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
