use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use serde::Serialize;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqliteConnection, SqlitePool};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::DatabaseConfig;

/// Errors raised while acquiring a connection or running a statement
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Invalid database URL: {0}")]
    InvalidDatabaseUrl(String),

    #[error("Statement timed out after {0:?}")]
    StatementTimeout(Duration),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Snapshot of pool occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub size: u32,
    pub idle: usize,
    pub in_use: usize,
}

/// Bounded connection pool with scoped acquisition.
///
/// Every connection handed out by [`ConnectionSource::with_connection`] or
/// [`ConnectionSource::with_write_connection`] is returned before the caller
/// sees the operation's result, whether the statement succeeded, failed or
/// timed out.
#[derive(Clone)]
pub struct ConnectionSource {
    pool: SqlitePool,
    in_use: Arc<AtomicUsize>,
    statement_timeout: Duration,
}

/// A checked-out connection; dropping it hands the connection back
struct Lease {
    conn: PoolConnection<Sqlite>,
    in_use: Arc<AtomicUsize>,
}

impl Lease {
    fn connection(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.in_use.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ConnectionSource {
    /// Open a pool for the configured database, creating the file if missing.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| DatabaseError::InvalidDatabaseUrl(format!("{}: {}", config.url, e)))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect_with(options)
            .await?;

        info!(
            "Opened database pool for {} (max {} connections)",
            config.url, config.max_connections
        );
        Ok(Self::from_pool(pool, config.statement_timeout()))
    }

    pub fn from_pool(pool: SqlitePool, statement_timeout: Duration) -> Self {
        Self {
            pool,
            in_use: Arc::new(AtomicUsize::new(0)),
            statement_timeout,
        }
    }

    async fn acquire(&self) -> Result<Lease, DatabaseError> {
        // Waits (up to the acquire timeout) while every connection is leased
        let conn = self.pool.acquire().await?;
        self.in_use.fetch_add(1, Ordering::SeqCst);
        Ok(Lease {
            conn,
            in_use: Arc::clone(&self.in_use),
        })
    }

    /// Run a read-only `op` against one pooled connection, bounded by the
    /// statement timeout.
    ///
    /// The connection is released on every exit path of `op` before this
    /// returns; `op` cannot keep it because the borrow ends with its future.
    pub async fn with_connection<T, F>(&self, op: F) -> Result<T, DatabaseError>
    where
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, Result<T, sqlx::Error>>,
    {
        self.run(op, Some(self.statement_timeout)).await
    }

    /// Run a mutating `op` against one pooled connection.
    ///
    /// Only acquisition is bounded. Abandoning a write mid-flight could report
    /// a failure for a statement SQLite still commits, so writes run to
    /// completion.
    pub async fn with_write_connection<T, F>(&self, op: F) -> Result<T, DatabaseError>
    where
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, Result<T, sqlx::Error>>,
    {
        self.run(op, None).await
    }

    async fn run<T, F>(&self, op: F, limit: Option<Duration>) -> Result<T, DatabaseError>
    where
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, Result<T, sqlx::Error>>,
    {
        let mut lease = self.acquire().await?;
        debug!("Acquired connection ({} in use)", self.in_use.load(Ordering::SeqCst));

        let outcome = match limit {
            Some(limit) => tokio::time::timeout(limit, op(lease.connection()))
                .await
                .map_err(|_| DatabaseError::StatementTimeout(limit)),
            None => Ok(op(lease.connection()).await),
        };
        drop(lease);

        outcome?.map_err(DatabaseError::from)
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            size: self.pool.size(),
            idle: self.pool.num_idle(),
            in_use: self.in_use.load(Ordering::SeqCst),
        }
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Closed database pool");
    }
}
