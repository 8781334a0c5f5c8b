//! `PostgreSQL` queue store for the Wereda queue system.
//!
//! Implements the `wereda-core` store traits over a sqlx connection pool.
//! Isolation follows the contract documented on `wereda_core::store`:
//!
//! - Decision rows (tickets, counters, citizen anchor rows) are read with
//!   `SELECT … FOR UPDATE` inside the operation's transaction.
//! - FIFO claims use `ORDER BY id LIMIT 1 FOR UPDATE SKIP LOCKED`, so two
//!   concurrent claimers never see the same candidate - the second one gets
//!   the next ticket in line instead of blocking.
//! - The ticket sequence is a database sequence consumed in the creation
//!   transaction; codes cannot collide under concurrent creation.
//!
//! Lock order is constant across operations (citizen → ticket → counter,
//! with tickets only ever claim-locked via `SKIP LOCKED`), which keeps the
//! store deadlock-free.

mod rows;
mod store;

use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use wereda_core::store::StoreError;

/// Embedded schema migrations, applied at startup.
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// `PostgreSQL`-backed implementation of the queue store.
#[derive(Clone)]
pub struct PostgresQueueStore {
    pool: PgPool,
}

impl PostgresQueueStore {
    /// Connect to the database and build a pool.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] when the database is unreachable.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] when a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        tracing::info!("database migrations applied");
        Ok(())
    }

    /// Access the underlying connection pool (health checks, manual queries).
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}
