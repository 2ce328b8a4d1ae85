// ABOUTME: Dashboard type definitions
// ABOUTME: Metric counters and activity feed entries as served to the UI

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use ecflow_core::EntityRef;
use ecflow_workflow::AuditAction;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardMetrics {
    #[serde(rename = "activeECRs")]
    pub active_ecrs: i64,
    #[serde(rename = "inProgressECOs")]
    pub in_progress_ecos: i64,
    #[serde(rename = "pendingApprovals")]
    pub pending_approvals: i64,
    #[serde(rename = "completedThisMonth")]
    pub completed_this_month: i64,
}

/// One creation or status change
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    #[serde(flatten)]
    pub subject: EntityRef,
    pub number: Option<String>,
    pub title: Option<String>,
    pub action: AuditAction,
    pub user_id: Option<String>,
    pub changes: Value,
    pub created_at: DateTime<Utc>,
}
