//! In-process result cache.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use saga_domain::CacheError;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::ResultCache;

struct CacheEntry {
    value: Value,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Result cache over an in-process map with per-entry TTLs.
#[derive(Default)]
pub struct MemoryResultCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryResultCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of unexpired entries. Exposed for tests and inspection.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .await
            .values()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }

    /// True when the cache holds no unexpired entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ResultCache for MemoryResultCache {
    async fn put(&self, key: &str, value: &Value, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            CacheEntry {
                value: value.clone(),
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        if let Some(entry) = entries.get(key) {
            if entry.is_expired(now) {
                entries.remove(key);
                return Ok(None);
            }
            return Ok(Some(entry.value.clone()));
        }
        Ok(None)
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_delete() {
        let cache = MemoryResultCache::new();
        let value = serde_json::json!({ "filled": 10 });

        cache.put("run:0", &value, None).await.expect("ok");
        assert_eq!(cache.get("run:0").await.expect("ok"), Some(value));

        cache.delete("run:0").await.expect("ok");
        assert_eq!(cache.get("run:0").await.expect("ok"), None);
        cache.delete("run:0").await.expect("missing delete is ok");
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let cache = MemoryResultCache::new();
        let value = serde_json::json!(1);

        cache
            .put("run:0", &value, Some(Duration::from_secs(60)))
            .await
            .expect("ok");
        assert_eq!(cache.len().await, 1);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.get("run:0").await.expect("ok"), None);
        assert!(cache.is_empty().await);
    }
}
