//! In-memory store with snapshot transaction semantics.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use saga_domain::StoreError;
use saga_execution::store::TransactionalStore;
use serde_json::Value;
use tokio::sync::RwLock;

/// One open unit of work: a snapshot of the store taken at `begin`.
///
/// Reads and writes land on the snapshot. `commit` publishes the snapshot as
/// the new store state; `rollback` discards it. Commit is last-writer-wins
/// across concurrent handles, which is enough for saga steps serialized
/// under the run's lock.
pub struct MemoryTransaction {
    snapshot: HashMap<String, Value>,
}

impl MemoryTransaction {
    /// Reads a key as seen by this unit of work.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.snapshot.get(key)
    }

    /// Writes a key inside this unit of work.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.snapshot.insert(key.into(), value);
    }

    /// Removes a key inside this unit of work, returning the prior value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.snapshot.remove(key)
    }
}

/// Store over an in-process map, for tests and single-process embedding.
///
/// Clones share the same underlying state.
#[derive(Default, Clone)]
pub struct MemoryStore {
    state: Arc<RwLock<HashMap<String, Value>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a committed value.
    pub async fn get(&self, key: &str) -> Option<Value> {
        self.state.read().await.get(key).cloned()
    }

    /// Number of committed keys.
    pub async fn len(&self) -> usize {
        self.state.read().await.len()
    }

    /// True when no key has been committed.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.is_empty()
    }
}

#[async_trait]
impl TransactionalStore for MemoryStore {
    type Handle = MemoryTransaction;

    async fn begin(&self) -> Result<MemoryTransaction, StoreError> {
        Ok(MemoryTransaction {
            snapshot: self.state.read().await.clone(),
        })
    }

    async fn commit(&self, handle: MemoryTransaction) -> Result<(), StoreError> {
        *self.state.write().await = handle.snapshot;
        Ok(())
    }

    async fn rollback(&self, _handle: MemoryTransaction) -> Result<(), StoreError> {
        Ok(())
    }
}
