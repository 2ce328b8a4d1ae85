// ABOUTME: Comment storage layer using SQLite
// ABOUTME: Creation against an existing subject and newest-first thread listing

use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use ecflow_core::{generate_id, EntityRef};
use ecflow_storage::StorageError;
use ecflow_workflow::WorkflowStorage;

use crate::types::{Comment, CommentCreateInput};

pub struct CommentStorage {
    pool: SqlitePool,
    subjects: WorkflowStorage,
}

impl CommentStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            subjects: WorkflowStorage::new(pool.clone()),
            pool,
        }
    }

    /// Store a comment. `NotFound` when the subject is not a record of `org_id`.
    pub async fn create_comment(
        &self,
        org_id: &str,
        user_id: &str,
        input: CommentCreateInput,
    ) -> Result<Comment, StorageError> {
        let subject = input.subject();
        self.subjects.subject_summary(org_id, &subject).await?;

        let comment_id = generate_id("cmt");
        debug!("Creating comment {} on {} by {}", comment_id, subject, user_id);

        sqlx::query(
            r#"
            INSERT INTO comments (
                id, org_id, entity_type, entity_id, user_id,
                comment_text, is_internal, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&comment_id)
        .bind(org_id)
        .bind(subject.entity_type)
        .bind(&subject.entity_id)
        .bind(user_id)
        .bind(input.comment_text.trim())
        .bind(input.is_internal)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        self.get_comment(org_id, &comment_id).await
    }

    pub async fn get_comment(&self, org_id: &str, comment_id: &str) -> Result<Comment, StorageError> {
        let row = sqlx::query("SELECT * FROM comments WHERE id = ? AND org_id = ?")
            .bind(comment_id)
            .bind(org_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?
            .ok_or(StorageError::NotFound)?;

        self.row_to_comment(&row)
    }

    pub async fn list_for_subject(
        &self,
        org_id: &str,
        subject: &EntityRef,
    ) -> Result<Vec<Comment>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM comments
            WHERE org_id = ? AND entity_type = ? AND entity_id = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(org_id)
        .bind(subject.entity_type)
        .bind(&subject.entity_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        rows.iter().map(|row| self.row_to_comment(row)).collect()
    }

    fn row_to_comment(&self, row: &sqlx::sqlite::SqliteRow) -> Result<Comment, StorageError> {
        Ok(Comment {
            id: row.try_get("id").map_err(StorageError::Sqlx)?,
            org_id: row.try_get("org_id").map_err(StorageError::Sqlx)?,
            subject: EntityRef::new(
                row.try_get("entity_type").map_err(StorageError::Sqlx)?,
                row.try_get::<String, _>("entity_id")
                    .map_err(StorageError::Sqlx)?,
            ),
            user_id: row.try_get("user_id").map_err(StorageError::Sqlx)?,
            text: row.try_get("comment_text").map_err(StorageError::Sqlx)?,
            is_internal: row.try_get("is_internal").map_err(StorageError::Sqlx)?,
            created_at: row.try_get("created_at").map_err(StorageError::Sqlx)?,
            edited_at: row.try_get("edited_at").map_err(StorageError::Sqlx)?,
        })
    }
}
