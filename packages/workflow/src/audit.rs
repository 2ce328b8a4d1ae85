// ABOUTME: Append-only audit trail for workflow records
// ABOUTME: Entries are written on the caller's connection so they commit with the change

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::SqliteConnection;

use ecflow_core::{generate_id, EntityRef};
use ecflow_storage::StorageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    StatusChanged,
    Updated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: String,
    pub org_id: String,
    pub user_id: Option<String>,
    pub subject: EntityRef,
    pub action: AuditAction,
    pub changes: Value,
    pub created_at: DateTime<Utc>,
}

/// `{"<field>": {"from": .., "to": ..}}`
pub fn field_change(field: &str, from: impl ToString, to: impl ToString) -> Value {
    json!({ field: { "from": from.to_string(), "to": to.to_string() } })
}

pub(crate) async fn append(
    conn: &mut SqliteConnection,
    org_id: &str,
    user_id: &str,
    subject: &EntityRef,
    action: AuditAction,
    changes: Value,
    at: DateTime<Utc>,
) -> Result<(), StorageError> {
    sqlx::query(
        r#"
        INSERT INTO audit_log (id, org_id, user_id, entity_type, entity_id, action, changes, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(generate_id("aud"))
    .bind(org_id)
    .bind(user_id)
    .bind(subject.entity_type)
    .bind(&subject.entity_id)
    .bind(action)
    .bind(changes.to_string())
    .bind(at)
    .execute(&mut *conn)
    .await
    .map_err(StorageError::Sqlx)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_change_shape() {
        let change = field_change("status", "draft", "submitted");
        assert_eq!(change["status"]["from"], "draft");
        assert_eq!(change["status"]["to"], "submitted");
    }
}
