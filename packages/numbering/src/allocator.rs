// ABOUTME: Atomic sequence allocator backed by the sequence_counters table
// ABOUTME: Serializes allocation per (organization, entity type, year) key

use chrono::{DateTime, Datelike, Utc};
use sqlx::SqlitePool;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use ecflow_core::EntityType;
use ecflow_storage::StorageError;

use crate::number::format_number;

/// Attempts made before giving up on a contended counter row
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Base delay between attempts; grows linearly with the attempt number
const RETRY_BACKOFF: Duration = Duration::from_millis(20);

#[derive(Debug, Error)]
pub enum AllocationError {
    #[error("Could not allocate a number for {key} after {attempts} attempts")]
    Conflict { key: SequenceKey, attempts: u32 },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Partition key of a counter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SequenceKey {
    pub org_id: String,
    pub entity_type: EntityType,
    pub year: i32,
}

impl fmt::Display for SequenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.org_id, self.entity_type, self.year)
    }
}

/// Hands out numbers such as `ECR-25-007`.
///
/// Each call performs a single `INSERT .. ON CONFLICT DO UPDATE .. RETURNING`
/// statement, so the increment and the read of the new value are one atomic
/// write. Two callers can never observe the same value. A number whose entity
/// is never inserted is simply skipped; numbers are never reused.
pub struct SequenceAllocator {
    pool: SqlitePool,
    max_attempts: u32,
}

impl SequenceAllocator {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Allocate the next number for `entity_type` in `org_id` for the current year
    pub async fn allocate(
        &self,
        org_id: &str,
        entity_type: EntityType,
    ) -> Result<String, AllocationError> {
        self.allocate_at(org_id, entity_type, Utc::now()).await
    }

    /// Allocate using the calendar year of `at`
    pub async fn allocate_at(
        &self,
        org_id: &str,
        entity_type: EntityType,
        at: DateTime<Utc>,
    ) -> Result<String, AllocationError> {
        let key = SequenceKey {
            org_id: org_id.to_string(),
            entity_type,
            year: at.year(),
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.increment(&key, at).await {
                Ok(sequence) => {
                    let number = format_number(entity_type, key.year, sequence);
                    debug!("Allocated {} for {}", number, key);
                    return Ok(number);
                }
                Err(err) if err.is_contention() && attempt < self.max_attempts => {
                    warn!(
                        "Counter {} contended (attempt {}/{}): {}",
                        key, attempt, self.max_attempts, err
                    );
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                Err(err) if err.is_contention() => {
                    warn!("Giving up on counter {} after {} attempts", key, attempt);
                    return Err(AllocationError::Conflict {
                        key,
                        attempts: attempt,
                    });
                }
                Err(err) => return Err(AllocationError::Storage(err)),
            }
        }
    }

    /// Last value handed out for a key (0 when nothing was allocated yet)
    pub async fn current(&self, key: &SequenceKey) -> Result<i64, StorageError> {
        let value: Option<i64> = sqlx::query_scalar(
            "SELECT value FROM sequence_counters WHERE org_id = ? AND entity_type = ? AND year = ?",
        )
        .bind(&key.org_id)
        .bind(key.entity_type)
        .bind(key.year)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        Ok(value.unwrap_or(0))
    }

    async fn increment(&self, key: &SequenceKey, at: DateTime<Utc>) -> Result<i64, StorageError> {
        sqlx::query_scalar(
            r#"
            INSERT INTO sequence_counters (org_id, entity_type, year, value, updated_at)
            VALUES (?, ?, ?, 1, ?)
            ON CONFLICT (org_id, entity_type, year)
            DO UPDATE SET value = value + 1, updated_at = excluded.updated_at
            RETURNING value
            "#,
        )
        .bind(&key.org_id)
        .bind(key.entity_type)
        .bind(key.year)
        .bind(at)
        .fetch_one(&self.pool)
        .await
        .map_err(StorageError::Sqlx)
    }
}
