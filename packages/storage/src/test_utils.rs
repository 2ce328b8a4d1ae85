//! Database fixtures for integration tests in downstream packages

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use tempfile::TempDir;

use crate::db::{connect, connect_with_busy_timeout, run_migrations};

/// Migrated in-memory database on a single connection.
///
/// One connection keeps every query on the same in-memory database, so callers
/// must never hold a transaction while using the pool elsewhere.
pub async fn memory_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("valid in-memory url")
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("in-memory database");

    run_migrations(&pool).await.expect("migrations apply");
    pool
}

/// Migrated file-backed database with a real multi-connection pool, for
/// tests that exercise concurrent writers. Keep the `TempDir` alive.
pub async fn file_pool() -> (SqlitePool, TempDir) {
    let dir = TempDir::new().expect("temp dir");
    let pool = connect(&dir.path().join("ecflow-test.db"))
        .await
        .expect("file database");
    run_migrations(&pool).await.expect("migrations apply");
    (pool, dir)
}

/// File-backed pool whose writers report SQLITE_BUSY after `busy_timeout`,
/// for tests that hold a write lock on purpose
pub async fn file_pool_with_busy_timeout(busy_timeout: Duration) -> (SqlitePool, TempDir) {
    let dir = TempDir::new().expect("temp dir");
    let pool = connect_with_busy_timeout(&dir.path().join("ecflow-test.db"), busy_timeout)
        .await
        .expect("file database");
    run_migrations(&pool).await.expect("migrations apply");
    (pool, dir)
}
