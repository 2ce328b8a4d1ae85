// ABOUTME: Approval coordinator for polymorphic approval subjects
// ABOUTME: Guards one open task per approver and level, and atomic single-shot resolution

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use tracing::{debug, info, warn};

use ecflow_core::{generate_id, EntityRef};
use ecflow_notifications::{
    notify_best_effort, NotificationCreateInput, NotificationKind, NotificationSink,
};
use ecflow_storage::StorageError;
use ecflow_workflow::{SubjectSummary, WorkflowStorage};

use crate::error::ApprovalError;
use crate::types::{
    Approval, ApprovalOpenInput, ApprovalResolveInput, ApprovalStatus, SubjectApprovals,
};

pub struct ApprovalCoordinator {
    pool: SqlitePool,
    subjects: WorkflowStorage,
    notifier: Arc<dyn NotificationSink>,
}

impl ApprovalCoordinator {
    pub fn new(pool: SqlitePool, notifier: Arc<dyn NotificationSink>) -> Self {
        Self {
            subjects: WorkflowStorage::new(pool.clone()),
            pool,
            notifier,
        }
    }

    /// Open a pending approval on a subject of `org_id`
    pub async fn open_approval(
        &self,
        org_id: &str,
        input: ApprovalOpenInput,
    ) -> Result<Approval, ApprovalError> {
        input.validate().map_err(ApprovalError::Validation)?;

        let subject = input.subject();
        let summary = self.subject_summary(org_id, &subject).await?;

        let open: Option<String> = sqlx::query_scalar(
            r#"
            SELECT id FROM approvals
            WHERE entity_type = ? AND entity_id = ? AND approver_id = ?
              AND approval_level = ? AND status = 'pending'
            "#,
        )
        .bind(subject.entity_type)
        .bind(&subject.entity_id)
        .bind(&input.approver_id)
        .bind(input.approval_level)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        if open.is_some() {
            return Err(duplicate(&input));
        }

        let approval_id = generate_id("apr");
        debug!(
            "Opening approval {} on {} for {} (level {})",
            approval_id, subject, input.approver_id, input.approval_level
        );

        // The partial unique index settles races between concurrent openers
        let inserted = sqlx::query(
            r#"
            INSERT INTO approvals (
                id, org_id, entity_type, entity_id, approver_id,
                approval_level, status, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, 'pending', ?)
            "#,
        )
        .bind(&approval_id)
        .bind(&summary.org_id)
        .bind(subject.entity_type)
        .bind(&subject.entity_id)
        .bind(&input.approver_id)
        .bind(input.approval_level)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx);

        match inserted {
            Ok(_) => {}
            Err(e) if e.is_unique_violation() => return Err(duplicate(&input)),
            Err(e) => return Err(e.into()),
        }

        let approval = self.get_approval(org_id, &approval_id).await?;

        notify_best_effort(
            self.notifier.as_ref(),
            NotificationCreateInput {
                org_id: summary.org_id.clone(),
                user_id: approval.approver_id.clone(),
                subject: Some(subject),
                kind: NotificationKind::ApprovalRequested,
                title: format!("Approval requested for {}", summary.number),
                message: Some(summary.title),
            },
        )
        .await;

        Ok(approval)
    }

    /// Record a decision. Only the assigned approver may resolve, and only a
    /// pending or conditional approval can be resolved.
    pub async fn resolve(
        &self,
        org_id: &str,
        approval_id: &str,
        actor_id: &str,
        input: ApprovalResolveInput,
    ) -> Result<Approval, ApprovalError> {
        input.validate().map_err(ApprovalError::Validation)?;

        let approval = self.get_approval(org_id, approval_id).await?;
        if approval.status.is_final() {
            return Err(already_resolved(&approval));
        }
        if approval.approver_id != actor_id {
            return Err(ApprovalError::NotApprover {
                id: approval_id.to_string(),
            });
        }

        let status = ApprovalStatus::from(input.decision);
        let result = sqlx::query(
            r#"
            UPDATE approvals SET
                status = ?,
                comments = COALESCE(?, comments),
                conditions = COALESCE(?, conditions),
                resolved_at = ?
            WHERE id = ? AND org_id = ? AND status IN ('pending', 'conditional')
            "#,
        )
        .bind(status)
        .bind(&input.comments)
        .bind(&input.conditions)
        .bind(Utc::now())
        .bind(approval_id)
        .bind(org_id)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        if result.rows_affected() == 0 {
            let current = self.get_approval(org_id, approval_id).await?;
            return Err(already_resolved(&current));
        }

        let resolved = self.get_approval(org_id, approval_id).await?;
        info!(
            "Approval {} on {} resolved as {} by {}",
            approval_id, resolved.subject, status, actor_id
        );

        self.notify_owner(&resolved).await;
        Ok(resolved)
    }

    /// True iff every approval on the subject is approved. With no approvals
    /// on record the answer follows the subject's own review policy.
    pub async fn is_satisfied(
        &self,
        org_id: &str,
        subject: &EntityRef,
    ) -> Result<bool, ApprovalError> {
        let summary = self.subject_summary(org_id, subject).await?;

        let (total, approved): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(SUM(CASE WHEN status = 'approved' THEN 1 ELSE 0 END), 0)
            FROM approvals
            WHERE org_id = ? AND entity_type = ? AND entity_id = ?
            "#,
        )
        .bind(org_id)
        .bind(subject.entity_type)
        .bind(&subject.entity_id)
        .fetch_one(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        if total == 0 {
            return Ok(!summary.requires_review);
        }
        Ok(total == approved)
    }

    /// Pending approvals assigned to `approver_id`, newest first
    pub async fn pending_for(
        &self,
        approver_id: &str,
        org_id: &str,
    ) -> Result<Vec<Approval>, ApprovalError> {
        debug!("Fetching pending approvals for {} in org {}", approver_id, org_id);

        let rows = sqlx::query(
            r#"
            SELECT * FROM approvals
            WHERE approver_id = ? AND org_id = ? AND status = 'pending'
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(approver_id)
        .bind(org_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        rows.iter().map(row_to_approval).collect()
    }

    /// All approvals on a subject, lowest level first
    pub async fn list_for_subject(
        &self,
        org_id: &str,
        subject: &EntityRef,
    ) -> Result<Vec<Approval>, ApprovalError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM approvals
            WHERE org_id = ? AND entity_type = ? AND entity_id = ?
            ORDER BY approval_level ASC, created_at ASC, id ASC
            "#,
        )
        .bind(org_id)
        .bind(subject.entity_type)
        .bind(&subject.entity_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        rows.iter().map(row_to_approval).collect()
    }

    pub async fn subject_approvals(
        &self,
        org_id: &str,
        subject: &EntityRef,
    ) -> Result<SubjectApprovals, ApprovalError> {
        let satisfied = self.is_satisfied(org_id, subject).await?;
        let approvals = self.list_for_subject(org_id, subject).await?;
        Ok(SubjectApprovals {
            approvals,
            satisfied,
        })
    }

    pub async fn get_approval(
        &self,
        org_id: &str,
        approval_id: &str,
    ) -> Result<Approval, ApprovalError> {
        let row = sqlx::query("SELECT * FROM approvals WHERE id = ? AND org_id = ?")
            .bind(approval_id)
            .bind(org_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?
            .ok_or_else(|| ApprovalError::NotFound(approval_id.to_string()))?;

        row_to_approval(&row)
    }

    async fn subject_summary(
        &self,
        org_id: &str,
        subject: &EntityRef,
    ) -> Result<SubjectSummary, ApprovalError> {
        self.subjects
            .subject_summary(org_id, subject)
            .await
            .map_err(|e| match e {
                StorageError::NotFound => ApprovalError::SubjectNotFound(subject.clone()),
                other => ApprovalError::Storage(other),
            })
    }

    async fn notify_owner(&self, approval: &Approval) {
        let summary = match self
            .subjects
            .subject_summary(&approval.org_id, &approval.subject)
            .await
        {
            Ok(summary) => summary,
            Err(e) => {
                warn!(
                    "Could not resolve owner of {} for notification: {}",
                    approval.subject, e
                );
                return;
            }
        };

        notify_best_effort(
            self.notifier.as_ref(),
            NotificationCreateInput {
                org_id: approval.org_id.clone(),
                user_id: summary.owner_id,
                subject: Some(approval.subject.clone()),
                kind: NotificationKind::ApprovalResolved,
                title: format!(
                    "{} {} by {}",
                    summary.number, approval.status, approval.approver_id
                ),
                message: approval.comments.clone(),
            },
        )
        .await;
    }
}

fn duplicate(input: &ApprovalOpenInput) -> ApprovalError {
    ApprovalError::DuplicateApproval {
        subject: input.subject(),
        approver_id: input.approver_id.clone(),
        level: input.approval_level,
    }
}

fn already_resolved(approval: &Approval) -> ApprovalError {
    ApprovalError::AlreadyResolved {
        id: approval.id.clone(),
        status: approval.status.to_string(),
    }
}

fn row_to_approval(row: &SqliteRow) -> Result<Approval, ApprovalError> {
    Ok(Approval {
        id: row.try_get("id").map_err(StorageError::Sqlx)?,
        org_id: row.try_get("org_id").map_err(StorageError::Sqlx)?,
        subject: EntityRef::new(
            row.try_get("entity_type").map_err(StorageError::Sqlx)?,
            row.try_get::<String, _>("entity_id")
                .map_err(StorageError::Sqlx)?,
        ),
        approver_id: row.try_get("approver_id").map_err(StorageError::Sqlx)?,
        approval_level: row.try_get("approval_level").map_err(StorageError::Sqlx)?,
        status: row.try_get("status").map_err(StorageError::Sqlx)?,
        comments: row.try_get("comments").map_err(StorageError::Sqlx)?,
        conditions: row.try_get("conditions").map_err(StorageError::Sqlx)?,
        created_at: row.try_get("created_at").map_err(StorageError::Sqlx)?,
        resolved_at: row.try_get("resolved_at").map_err(StorageError::Sqlx)?,
    })
}
