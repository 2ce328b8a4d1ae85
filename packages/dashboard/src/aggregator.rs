// ABOUTME: Dashboard aggregator computing metrics from current records
// ABOUTME: Counts only, scoped to one organization, with UTC calendar months

use chrono::{DateTime, Datelike, Days, Months, NaiveTime, TimeZone, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use ecflow_core::{EntityRef, DEFAULT_ACTIVITY_LIMIT, MAX_ACTIVITY_LIMIT};
use ecflow_storage::StorageError;

use crate::types::{ActivityEntry, DashboardMetrics};

/// `[start, end)` of the UTC calendar month containing `now`
pub fn month_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let first_day = now.date_naive() - Days::new(u64::from(now.day0()));
    let next_first_day = first_day + Months::new(1);
    (
        Utc.from_utc_datetime(&first_day.and_time(NaiveTime::MIN)),
        Utc.from_utc_datetime(&next_first_day.and_time(NaiveTime::MIN)),
    )
}

pub struct DashboardAggregator {
    pool: SqlitePool,
}

impl DashboardAggregator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn metrics(&self, org_id: &str) -> Result<DashboardMetrics, StorageError> {
        self.metrics_at(org_id, Utc::now()).await
    }

    /// Metrics as of `now`, which only selects the month for `completedThisMonth`
    pub async fn metrics_at(
        &self,
        org_id: &str,
        now: DateTime<Utc>,
    ) -> Result<DashboardMetrics, StorageError> {
        let (month_start, month_end) = month_window(now);
        debug!(
            "Computing dashboard metrics for org: {} (month {} .. {})",
            org_id, month_start, month_end
        );

        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM ecrs WHERE org_id = ? AND status = 'submitted') AS active_ecrs,
                (SELECT COUNT(*) FROM ecos WHERE org_id = ? AND status = 'in_progress') AS in_progress_ecos,
                (SELECT COUNT(*) FROM approvals WHERE org_id = ? AND status = 'pending') AS pending_approvals,
                (SELECT COUNT(*) FROM ecos
                    WHERE org_id = ? AND status = 'completed'
                      AND completed_at >= ? AND completed_at < ?) AS completed_this_month
            "#,
        )
        .bind(org_id)
        .bind(org_id)
        .bind(org_id)
        .bind(org_id)
        .bind(month_start)
        .bind(month_end)
        .fetch_one(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        Ok(DashboardMetrics {
            active_ecrs: row.try_get("active_ecrs").map_err(StorageError::Sqlx)?,
            in_progress_ecos: row.try_get("in_progress_ecos").map_err(StorageError::Sqlx)?,
            pending_approvals: row.try_get("pending_approvals").map_err(StorageError::Sqlx)?,
            completed_this_month: row
                .try_get("completed_this_month")
                .map_err(StorageError::Sqlx)?,
        })
    }

    /// Newest creations and status changes across ECRs, ECOs and ECNs.
    ///
    /// `limit` defaults to 10 and is clamped to 0..=100. Entries sharing a
    /// timestamp are ordered by entity id, then by append order.
    pub async fn recent_activity(
        &self,
        org_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<ActivityEntry>, StorageError> {
        let limit = limit
            .unwrap_or(DEFAULT_ACTIVITY_LIMIT)
            .clamp(0, MAX_ACTIVITY_LIMIT);
        if limit == 0 {
            return Ok(Vec::new());
        }
        debug!("Fetching {} activity entries for org: {}", limit, org_id);

        let rows = sqlx::query(
            r#"
            SELECT
                a.entity_type, a.entity_id, a.action, a.user_id, a.changes, a.created_at,
                COALESCE(r.ecr_number, o.eco_number, n.ecn_number) AS number,
                COALESCE(r.title, o.title, n.title) AS title
            FROM audit_log a
            LEFT JOIN ecrs r ON a.entity_type = 'ECR' AND r.id = a.entity_id
            LEFT JOIN ecos o ON a.entity_type = 'ECO' AND o.id = a.entity_id
            LEFT JOIN ecns n ON a.entity_type = 'ECN' AND n.id = a.entity_id
            WHERE a.org_id = ? AND a.action IN ('created', 'status_changed')
            ORDER BY a.created_at DESC, a.entity_id DESC, a.seq DESC
            LIMIT ?
            "#,
        )
        .bind(org_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        rows.iter()
            .map(|row| {
                let changes: Option<String> = row.try_get("changes").map_err(StorageError::Sqlx)?;
                Ok(ActivityEntry {
                    subject: EntityRef::new(
                        row.try_get("entity_type").map_err(StorageError::Sqlx)?,
                        row.try_get::<String, _>("entity_id")
                            .map_err(StorageError::Sqlx)?,
                    ),
                    number: row.try_get("number").map_err(StorageError::Sqlx)?,
                    title: row.try_get("title").map_err(StorageError::Sqlx)?,
                    action: row.try_get("action").map_err(StorageError::Sqlx)?,
                    user_id: row.try_get("user_id").map_err(StorageError::Sqlx)?,
                    changes: match changes {
                        Some(json) => serde_json::from_str(&json)?,
                        None => serde_json::Value::Null,
                    },
                    created_at: row.try_get("created_at").map_err(StorageError::Sqlx)?,
                })
            })
            .collect()
    }
}
