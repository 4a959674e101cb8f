//! Lock backend contract and the ownership-safe lock client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use saga_domain::LockError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

/// Shared backend holding time-bounded mutual-exclusion entries.
///
/// All three operations must be atomic against the shared state. Entries
/// carry the holder's ownership token so release and renewal can be
/// conditional: a stale holder must never remove or extend a lock that was
/// legitimately re-acquired by someone else after its lease expired.
#[async_trait]
pub trait LockBackend: Send + Sync {
    /// Atomically stores `token` under `key` with the given lease, unless an
    /// unexpired entry already exists. Returns `false` when the key is held.
    ///
    /// # Errors
    /// Returns an error if the backend is unreachable.
    async fn try_set(&self, key: &str, token: &str, ttl: Duration) -> Result<bool, LockError>;

    /// Deletes `key` only if it currently holds `token`. Returns `false`
    /// when the entry is gone, expired, or owned by a different token.
    ///
    /// # Errors
    /// Returns an error if the backend is unreachable.
    async fn release_if_owner(&self, key: &str, token: &str) -> Result<bool, LockError>;

    /// Extends the lease of `key` only if it currently holds `token`.
    /// Returns `false` when ownership was lost.
    ///
    /// # Errors
    /// Returns an error if the backend is unreachable.
    async fn refresh_if_owner(
        &self,
        key: &str,
        token: &str,
        ttl: Duration,
    ) -> Result<bool, LockError>;
}

/// Distributed lock client.
///
/// Generates a random ownership token per acquisition and hands out a
/// [`LockGuard`] that renews the lease in the background until released.
#[derive(Clone)]
pub struct DistributedLock {
    backend: Arc<dyn LockBackend>,
    retry_attempts: u32,
    retry_delay: Duration,
    heartbeat: bool,
}

impl DistributedLock {
    /// Creates a lock client that fails fast on contention and renews held
    /// leases in the background.
    #[must_use]
    pub fn new(backend: Arc<dyn LockBackend>) -> Self {
        Self {
            backend,
            retry_attempts: 0,
            retry_delay: Duration::from_millis(250),
            heartbeat: true,
        }
    }

    /// Sets the acquisition retry policy.
    #[must_use]
    pub fn with_retry(mut self, attempts: u32, delay: Duration) -> Self {
        self.retry_attempts = attempts;
        self.retry_delay = delay;
        self
    }

    /// Enables or disables heartbeat lease renewal on acquired locks.
    ///
    /// Without renewal a holder whose work outlives the TTL silently loses
    /// mutual exclusion mid-run.
    #[must_use]
    pub fn with_heartbeat(mut self, enabled: bool) -> Self {
        self.heartbeat = enabled;
        self
    }

    /// Attempts to acquire `key` for `ttl`.
    ///
    /// Returns `Ok(None)` when the lock is held by someone else after all
    /// configured attempts.
    ///
    /// # Errors
    /// Returns an error if the backend fails.
    pub async fn acquire(&self, key: &str, ttl: Duration) -> Result<Option<LockGuard>, LockError> {
        let token = Uuid::new_v4().to_string();

        for attempt in 0..=self.retry_attempts {
            if self.backend.try_set(key, &token, ttl).await? {
                debug!(key, attempt, "Lock acquired");
                return Ok(Some(LockGuard::start(
                    self.backend.clone(),
                    key.to_string(),
                    token,
                    ttl,
                    self.heartbeat,
                )));
            }
            if attempt < self.retry_attempts {
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        debug!(key, "Lock contended");
        Ok(None)
    }
}

/// Held lock with background lease renewal.
///
/// Call [`LockGuard::release`] on every exit path. Dropping an unreleased
/// guard only stops the heartbeat; the entry then expires with its TTL, which
/// is the backstop for a crashed coordinator.
pub struct LockGuard {
    backend: Arc<dyn LockBackend>,
    key: String,
    token: String,
    heartbeat: Option<JoinHandle<()>>,
}

impl LockGuard {
    fn start(
        backend: Arc<dyn LockBackend>,
        key: String,
        token: String,
        ttl: Duration,
        heartbeat: bool,
    ) -> Self {
        let task = heartbeat.then(|| {
            tokio::spawn(heartbeat_loop(
                backend.clone(),
                key.clone(),
                token.clone(),
                ttl,
            ))
        });
        Self {
            backend,
            key,
            token,
            heartbeat: task,
        }
    }

    /// The key this guard holds.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Stops the heartbeat and conditionally deletes the lock entry.
    ///
    /// Returns `false` when the lock had already expired or been re-acquired
    /// by another owner; the other owner's entry is left untouched.
    ///
    /// # Errors
    /// Returns an error if the backend fails.
    pub async fn release(mut self) -> Result<bool, LockError> {
        if let Some(task) = self.heartbeat.take() {
            task.abort();
        }
        let released = self.backend.release_if_owner(&self.key, &self.token).await?;
        if !released {
            warn!(key = %self.key, "Lock was no longer owned at release");
        }
        Ok(released)
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Some(task) = self.heartbeat.take() {
            task.abort();
        }
    }
}

async fn heartbeat_loop(backend: Arc<dyn LockBackend>, key: String, token: String, ttl: Duration) {
    // Renew well inside the lease so one missed tick does not lose the lock.
    let period = (ttl / 3).max(Duration::from_millis(10));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.tick().await; // first tick fires immediately

    loop {
        ticker.tick().await;
        match backend.refresh_if_owner(&key, &token, ttl).await {
            Ok(true) => debug!(key = %key, "Lock lease renewed"),
            Ok(false) => {
                warn!(key = %key, "Lock ownership lost, stopping heartbeat");
                break;
            }
            Err(err) => {
                warn!(key = %key, error = %err, "Lock heartbeat failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::MemoryLockBackend;

    fn lock_without_heartbeat(backend: &Arc<MemoryLockBackend>) -> DistributedLock {
        DistributedLock::new(backend.clone()).with_heartbeat(false)
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_acquire_fails_until_release() {
        let backend = Arc::new(MemoryLockBackend::new());
        let lock = lock_without_heartbeat(&backend);
        let ttl = Duration::from_secs(30);

        let guard = lock
            .acquire("saga:lock:wallet:1", ttl)
            .await
            .expect("backend ok")
            .expect("first acquire succeeds");

        assert!(
            lock.acquire("saga:lock:wallet:1", ttl)
                .await
                .expect("backend ok")
                .is_none()
        );

        assert!(guard.release().await.expect("backend ok"));

        assert!(
            lock.acquire("saga:lock:wallet:1", ttl)
                .await
                .expect("backend ok")
                .is_some()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_release_leaves_new_owner_untouched() {
        let backend = Arc::new(MemoryLockBackend::new());
        let lock = lock_without_heartbeat(&backend);
        let ttl = Duration::from_secs(5);

        let stale = lock
            .acquire("saga:lock:wallet:1", ttl)
            .await
            .expect("backend ok")
            .expect("first acquire succeeds");

        // Lease expires while the stale holder is still working.
        tokio::time::advance(Duration::from_secs(6)).await;

        let fresh = lock
            .acquire("saga:lock:wallet:1", ttl)
            .await
            .expect("backend ok")
            .expect("expired lock can be re-acquired");

        // The unconditional delete of the reference behavior would remove the
        // fresh holder's entry here. The conditional release must not.
        assert!(!stale.release().await.expect("backend ok"));

        assert!(
            lock.acquire("saga:lock:wallet:1", ttl)
                .await
                .expect("backend ok")
                .is_none(),
            "fresh holder still excludes other callers"
        );

        assert!(fresh.release().await.expect("backend ok"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_outlives_original_ttl() {
        let backend = Arc::new(MemoryLockBackend::new());
        let lock = DistributedLock::new(backend.clone());
        let ttl = Duration::from_secs(3);

        let guard = lock
            .acquire("saga:lock:wallet:1", ttl)
            .await
            .expect("backend ok")
            .expect("acquire succeeds");

        // Long past the original lease; renewals keep the entry alive.
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert!(
            lock.acquire("saga:lock:wallet:1", ttl)
                .await
                .expect("backend ok")
                .is_none(),
            "renewed lock still held"
        );

        assert!(guard.release().await.expect("backend ok"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_policy_waits_for_release() {
        let backend = Arc::new(MemoryLockBackend::new());
        let ttl = Duration::from_secs(2);

        let holder = lock_without_heartbeat(&backend)
            .acquire("saga:lock:wallet:1", ttl)
            .await
            .expect("backend ok")
            .expect("acquire succeeds");
        drop(holder); // unreleased guard, entry expires with its TTL

        let retrying = DistributedLock::new(backend.clone())
            .with_heartbeat(false)
            .with_retry(4, Duration::from_secs(1));

        let guard = retrying
            .acquire("saga:lock:wallet:1", ttl)
            .await
            .expect("backend ok");
        assert!(guard.is_some(), "retries span the stale holder's TTL");
    }
}
