//! PostgreSQL store adapter.

use std::sync::Arc;

use async_trait::async_trait;
use saga_domain::StoreError;
use saga_execution::store::TransactionalStore;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;

/// Transactional store over a PostgreSQL connection pool.
///
/// Each unit of work is one `sqlx` transaction; steps and compensations
/// receive the transaction handle and issue their queries through it.
#[derive(Clone)]
pub struct PgStore {
    pool: Arc<PgPool>,
}

impl PgStore {
    /// Wraps an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Creates a new store from a connection string.
    ///
    /// # Arguments
    /// * `database_url` - PostgreSQL connection string
    ///
    /// # Errors
    /// Returns an error if the connection fails.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPool::connect(database_url).await?;
        info!("Connected to PostgreSQL store");
        Ok(Self::new(pool))
    }

    /// Returns a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TransactionalStore for PgStore {
    type Handle = Transaction<'static, Postgres>;

    async fn begin(&self) -> Result<Self::Handle, StoreError> {
        self.pool
            .begin()
            .await
            .map_err(|err| StoreError::Begin(err.into()))
    }

    async fn commit(&self, handle: Self::Handle) -> Result<(), StoreError> {
        handle
            .commit()
            .await
            .map_err(|err| StoreError::Commit(err.into()))
    }

    async fn rollback(&self, handle: Self::Handle) -> Result<(), StoreError> {
        handle
            .rollback()
            .await
            .map_err(|err| StoreError::Rollback(err.into()))
    }
}
