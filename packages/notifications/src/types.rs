// ABOUTME: Notification type definitions
// ABOUTME: Records delivered to a single recipient inside one organization

use chrono::{DateTime, Utc};
use ecflow_core::EntityRef;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ApprovalRequested,
    ApprovalResolved,
    StatusChanged,
    EcnApprovalResolved,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    #[serde(rename = "orgId")]
    pub org_id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub subject: Option<EntityRef>,
    pub kind: NotificationKind,
    pub title: String,
    pub message: Option<String>,
    #[serde(rename = "isRead")]
    pub is_read: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "readAt")]
    pub read_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationCreateInput {
    pub org_id: String,
    pub user_id: String,
    pub subject: Option<EntityRef>,
    pub kind: NotificationKind,
    pub title: String,
    pub message: Option<String>,
}
