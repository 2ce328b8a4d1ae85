// ABOUTME: Database connection management and schema bootstrap
// ABOUTME: Builds the SQLite pool with WAL, foreign keys and busy timeout, then migrates

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::StorageError;

/// Maximum pooled connections
const MAX_CONNECTIONS: u32 = 10;

/// How long a writer waits on a locked database before SQLite reports BUSY
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open a connection pool for the database file at `database_path`
pub async fn connect(database_path: &Path) -> Result<SqlitePool, StorageError> {
    connect_with_busy_timeout(database_path, BUSY_TIMEOUT).await
}

/// Like [`connect`], but writers give up on a locked database after `busy_timeout`
pub async fn connect_with_busy_timeout(
    database_path: &Path,
    busy_timeout: Duration,
) -> Result<SqlitePool, StorageError> {
    // Ensure parent directory exists
    if let Some(parent) = database_path.parent() {
        std::fs::create_dir_all(parent).map_err(StorageError::Io)?;
    }

    debug!("Connecting to database: {}", database_path.display());

    let options = SqliteConnectOptions::new()
        .filename(database_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(busy_timeout);

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(Duration::from_secs(30))
        .connect_with(options)
        .await
        .map_err(StorageError::Sqlx)?;

    info!("Database connection established");
    Ok(pool)
}

/// Apply the embedded migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), StorageError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(StorageError::Migration)?;

    debug!("Database migrations completed");
    Ok(())
}

/// Connect to the database (default location when `database_path` is None) and migrate it
pub async fn init_with_path(database_path: Option<PathBuf>) -> Result<SqlitePool, StorageError> {
    let database_path = database_path.unwrap_or_else(ecflow_core::default_database_path);
    let pool = connect(&database_path).await?;
    run_migrations(&pool).await?;
    Ok(pool)
}
