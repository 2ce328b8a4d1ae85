// ABOUTME: Notification storage layer using SQLite
// ABOUTME: Handles creation, recipient listing, and recipient-only read marking

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use ecflow_core::{generate_id, EntityRef, EntityType};
use ecflow_storage::StorageError;

use crate::sink::NotificationSink;
use crate::types::{Notification, NotificationCreateInput};

/// Most recent notifications returned per listing
pub const NOTIFICATION_LIST_LIMIT: i64 = 50;

pub struct NotificationStorage {
    pool: SqlitePool,
}

impl NotificationStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a notification for a single recipient
    pub async fn create_notification(
        &self,
        input: NotificationCreateInput,
    ) -> Result<Notification, StorageError> {
        let notification_id = generate_id("ntf");
        let now = Utc::now();

        debug!(
            "Creating notification: {} for user: {} ({:?})",
            notification_id, input.user_id, input.kind
        );

        sqlx::query(
            r#"
            INSERT INTO notifications (
                id, org_id, user_id, entity_type, entity_id,
                kind, title, message, is_read, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(&notification_id)
        .bind(&input.org_id)
        .bind(&input.user_id)
        .bind(input.subject.as_ref().map(|s| s.entity_type))
        .bind(input.subject.as_ref().map(|s| s.entity_id.clone()))
        .bind(input.kind)
        .bind(&input.title)
        .bind(&input.message)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        self.get_notification(&notification_id).await
    }

    pub async fn get_notification(&self, notification_id: &str) -> Result<Notification, StorageError> {
        let row = sqlx::query("SELECT * FROM notifications WHERE id = ?")
            .bind(notification_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?
            .ok_or(StorageError::NotFound)?;

        self.row_to_notification(&row)
    }

    /// Newest notifications for a recipient within one organization
    pub async fn list_for_user(
        &self,
        user_id: &str,
        org_id: &str,
    ) -> Result<Vec<Notification>, StorageError> {
        debug!("Fetching notifications for user: {} in org: {}", user_id, org_id);

        let rows = sqlx::query(
            r#"
            SELECT * FROM notifications
            WHERE user_id = ? AND org_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(org_id)
        .bind(NOTIFICATION_LIST_LIMIT)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        rows.iter()
            .map(|row| self.row_to_notification(row))
            .collect()
    }

    pub async fn unread_count(&self, user_id: &str, org_id: &str) -> Result<i64, StorageError> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND org_id = ? AND is_read = 0",
        )
        .bind(user_id)
        .bind(org_id)
        .fetch_one(&self.pool)
        .await
        .map_err(StorageError::Sqlx)
    }

    /// Mark a notification read. Only its recipient may do so; for anyone
    /// else the notification does not exist.
    pub async fn mark_read(
        &self,
        notification_id: &str,
        user_id: &str,
        org_id: &str,
    ) -> Result<Notification, StorageError> {
        debug!("Marking notification read: {} by user: {}", notification_id, user_id);

        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET is_read = 1, read_at = COALESCE(read_at, ?)
            WHERE id = ? AND user_id = ? AND org_id = ?
            "#,
        )
        .bind(Utc::now())
        .bind(notification_id)
        .bind(user_id)
        .bind(org_id)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        self.get_notification(notification_id).await
    }

    fn row_to_notification(&self, row: &sqlx::sqlite::SqliteRow) -> Result<Notification, StorageError> {
        let entity_type: Option<EntityType> = row.try_get("entity_type").map_err(StorageError::Sqlx)?;
        let entity_id: Option<String> = row.try_get("entity_id").map_err(StorageError::Sqlx)?;

        Ok(Notification {
            id: row.try_get("id").map_err(StorageError::Sqlx)?,
            org_id: row.try_get("org_id").map_err(StorageError::Sqlx)?,
            user_id: row.try_get("user_id").map_err(StorageError::Sqlx)?,
            subject: entity_type.zip(entity_id).map(|(t, id)| EntityRef::new(t, id)),
            kind: row.try_get("kind").map_err(StorageError::Sqlx)?,
            title: row.try_get("title").map_err(StorageError::Sqlx)?,
            message: row.try_get("message").map_err(StorageError::Sqlx)?,
            is_read: row.try_get("is_read").map_err(StorageError::Sqlx)?,
            created_at: row.try_get("created_at").map_err(StorageError::Sqlx)?,
            read_at: row.try_get("read_at").map_err(StorageError::Sqlx)?,
        })
    }
}

#[async_trait]
impl NotificationSink for NotificationStorage {
    async fn deliver(&self, input: NotificationCreateInput) -> Result<(), StorageError> {
        self.create_notification(input).await.map(|_| ())
    }
}
