// ABOUTME: Data layer and persistence for Ecflow
// ABOUTME: Storage error type, SQLite pool bootstrap, and embedded migrations

pub mod db;
#[cfg(feature = "test-utils")]
pub mod test_utils;

use thiserror::Error;

pub use db::{connect, connect_with_busy_timeout, init_with_path, run_migrations};

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("Sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Record not found")]
    NotFound,
}

pub type StorageResult<T> = Result<T, StorageError>;

impl StorageError {
    /// True when the underlying database rejected a write on a UNIQUE constraint
    pub fn is_unique_violation(&self) -> bool {
        match self {
            StorageError::Sqlx(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
            _ => false,
        }
    }

    /// True for SQLITE_BUSY / SQLITE_LOCKED (including extended codes)
    pub fn is_contention(&self) -> bool {
        match self {
            StorageError::Sqlx(sqlx::Error::Database(db_err)) => db_err
                .code()
                .and_then(|code| code.parse::<i32>().ok())
                .map(|code| matches!(code & 0xff, 5 | 6))
                .unwrap_or(false),
            _ => false,
        }
    }
}

/// Map `RowNotFound` onto the domain-level `NotFound`
pub fn not_found_aware(err: sqlx::Error) -> StorageError {
    match err {
        sqlx::Error::RowNotFound => StorageError::NotFound,
        other => StorageError::Sqlx(other),
    }
}
