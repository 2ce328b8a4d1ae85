// ABOUTME: Workflow engine enforcing ECR, ECO and ECN lifecycles
// ABOUTME: Every write is a guarded update plus an audit entry inside one transaction

use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::sync::Arc;
use tracing::{debug, info};

use ecflow_core::{generate_id, EntityRef, EntityType};
use ecflow_notifications::{
    notify_best_effort, NotificationCreateInput, NotificationKind, NotificationSink,
};
use ecflow_numbering::SequenceAllocator;
use ecflow_organizations::OrganizationStorage;
use ecflow_storage::StorageError;

use crate::audit::{self, field_change, AuditAction};
use crate::error::WorkflowError;
use crate::storage::{self, WorkflowStorage};
use crate::transitions::StateGraph;
use crate::types::{
    ApprovalType, EcnApprovalDecision, EcnApprovalStatus, Ecn, EcnCreateInput, Eco,
    EcoCreateInput, EcoStatus, EcoUpdateInput, Ecr, EcrCreateInput, EcrStatus, EcrUpdateInput,
    ImplementationStatus, NotificationType,
};

/// A guarded status write: `column` moves `from -> to` only if it still holds `from`
struct StatusWrite<'a> {
    org_id: &'a str,
    subject: EntityRef,
    column: &'static str,
    from: &'static str,
    to: &'static str,
    stamp: Option<&'static str>,
}

impl StatusWrite<'_> {
    fn table(&self) -> &'static str {
        match self.subject.entity_type {
            EntityType::Ecr => "ecrs",
            EntityType::Eco => "ecos",
            EntityType::Ecn => "ecns",
        }
    }
}

pub struct WorkflowEngine {
    pool: SqlitePool,
    storage: WorkflowStorage,
    allocator: SequenceAllocator,
    organizations: OrganizationStorage,
    notifier: Arc<dyn NotificationSink>,
}

impl WorkflowEngine {
    pub fn new(pool: SqlitePool, notifier: Arc<dyn NotificationSink>) -> Self {
        Self {
            storage: WorkflowStorage::new(pool.clone()),
            allocator: SequenceAllocator::new(pool.clone()),
            organizations: OrganizationStorage::new(pool.clone()),
            pool,
            notifier,
        }
    }

    pub fn storage(&self) -> &WorkflowStorage {
        &self.storage
    }

    // ---- ECR ----

    /// Create an ECR in `draft`, owned by `actor_id`
    pub async fn create_ecr(
        &self,
        org_id: &str,
        actor_id: &str,
        input: EcrCreateInput,
    ) -> Result<Ecr, WorkflowError> {
        input.validate().map_err(WorkflowError::Validation)?;

        let number = self.allocator.allocate(org_id, EntityType::Ecr).await?;
        let ecr_id = generate_id(EntityType::Ecr.id_prefix());
        let now = Utc::now();

        debug!("Creating ECR {} ({}) in org {}", number, ecr_id, org_id);

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO ecrs (
                id, org_id, ecr_number, title, description, business_justification,
                requestor_id, category, priority, status, approval_type,
                estimated_cost, estimated_hours, affected_products, affected_departments,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'draft', ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&ecr_id)
        .bind(org_id)
        .bind(&number)
        .bind(input.title.trim())
        .bind(&input.description)
        .bind(&input.business_justification)
        .bind(actor_id)
        .bind(&input.category)
        .bind(input.priority.unwrap_or_default())
        .bind(input.approval_type.unwrap_or_default())
        .bind(input.estimated_cost)
        .bind(input.estimated_hours)
        .bind(serde_json::to_string(&input.affected_products).map_err(StorageError::Json)?)
        .bind(serde_json::to_string(&input.affected_departments).map_err(StorageError::Json)?)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        audit::append(
            &mut tx,
            org_id,
            actor_id,
            &EntityRef::new(EntityType::Ecr, &ecr_id),
            AuditAction::Created,
            json!({ "number": number, "status": EcrStatus::Draft }),
            now,
        )
        .await?;
        tx.commit().await?;

        info!("Created {} for org {}", number, org_id);
        self.require_ecr(org_id, &ecr_id).await
    }

    /// Submit a draft (or a returned request) for review
    pub async fn submit_ecr(
        &self,
        org_id: &str,
        ecr_id: &str,
        actor_id: &str,
    ) -> Result<Ecr, WorkflowError> {
        self.transition_ecr(org_id, ecr_id, EcrStatus::Submitted, actor_id)
            .await
    }

    /// Move an ECR along one edge of its state graph.
    ///
    /// Entering `under_review` on a change review board request opens a
    /// level-1 approval for every board member in the same transaction as
    /// the status change, so the request never sits in review without them.
    pub async fn transition_ecr(
        &self,
        org_id: &str,
        ecr_id: &str,
        target: EcrStatus,
        actor_id: &str,
    ) -> Result<Ecr, WorkflowError> {
        let ecr = self.require_ecr(org_id, ecr_id).await?;
        if !ecr.status.can_transition_to(target) {
            return Err(WorkflowError::invalid_transition(
                EntityType::Ecr,
                ecr.status,
                target,
            ));
        }

        let stamp = match target {
            EcrStatus::Submitted => Some("submitted_at"),
            EcrStatus::Approved | EcrStatus::Rejected => Some("resolved_at"),
            _ => None,
        };
        let write = StatusWrite {
            org_id,
            subject: EntityRef::new(EntityType::Ecr, ecr_id),
            column: "status",
            from: ecr.status.as_str(),
            to: target.as_str(),
            stamp,
        };

        let board = if target == EcrStatus::UnderReview
            && ecr.approval_type == ApprovalType::ChangeReviewBoard
        {
            self.organizations.review_board(org_id).await?
        } else {
            Vec::new()
        };

        let now = Utc::now();
        let Some(mut tx) = self.begin_status_write(&write, now).await? else {
            let current = self.require_ecr(org_id, ecr_id).await?;
            return Err(WorkflowError::invalid_transition(
                EntityType::Ecr,
                current.status,
                target,
            ));
        };

        if target == EcrStatus::Approved && ecr.approval_type == ApprovalType::ChangeReviewBoard {
            let approvals: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM approvals WHERE entity_type = 'ECR' AND entity_id = ?",
            )
            .bind(ecr_id)
            .fetch_one(&mut *tx)
            .await?;

            if approvals == 0 {
                tx.rollback().await?;
                return Err(WorkflowError::ApprovalRequired {
                    entity: EntityType::Ecr,
                    id: ecr_id.to_string(),
                });
            }
        }

        let reviewers = open_board_approvals(&mut tx, org_id, ecr_id, &board, now).await?;

        self.finish_status_write(tx, &write, actor_id, now).await?;
        let updated = self.require_ecr(org_id, ecr_id).await?;

        info!(
            "{} moved {} -> {} by {}",
            updated.ecr_number, ecr.status, target, actor_id
        );

        for reviewer in reviewers {
            notify_best_effort(
                self.notifier.as_ref(),
                NotificationCreateInput {
                    org_id: org_id.to_string(),
                    user_id: reviewer,
                    subject: Some(write.subject.clone()),
                    kind: NotificationKind::ApprovalRequested,
                    title: format!("Approval requested for {}", updated.ecr_number),
                    message: Some(updated.title.clone()),
                },
            )
            .await;
        }

        if updated.requestor_id != actor_id {
            notify_best_effort(
                self.notifier.as_ref(),
                NotificationCreateInput {
                    org_id: org_id.to_string(),
                    user_id: updated.requestor_id.clone(),
                    subject: Some(write.subject.clone()),
                    kind: NotificationKind::StatusChanged,
                    title: format!("{} is now {}", updated.ecr_number, target),
                    message: Some(updated.title.clone()),
                },
            )
            .await;
        }

        Ok(updated)
    }

    /// Edit descriptive fields while the ECR is in `draft` or `more_info_needed`
    pub async fn update_ecr(
        &self,
        org_id: &str,
        ecr_id: &str,
        actor_id: &str,
        input: EcrUpdateInput,
    ) -> Result<Ecr, WorkflowError> {
        input.validate().map_err(WorkflowError::Validation)?;

        let ecr = self.require_ecr(org_id, ecr_id).await?;
        if !ecr.status.is_editable() {
            return Err(not_editable(EntityType::Ecr, ecr_id, ecr.status));
        }

        let affected_products = input
            .affected_products
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(StorageError::Json)?;
        let affected_departments = input
            .affected_departments
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(StorageError::Json)?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            r#"
            UPDATE ecrs SET
                title = COALESCE(?, title),
                description = COALESCE(?, description),
                business_justification = COALESCE(?, business_justification),
                category = COALESCE(?, category),
                priority = COALESCE(?, priority),
                approval_type = COALESCE(?, approval_type),
                estimated_cost = COALESCE(?, estimated_cost),
                estimated_hours = COALESCE(?, estimated_hours),
                affected_products = COALESCE(?, affected_products),
                affected_departments = COALESCE(?, affected_departments),
                updated_at = ?
            WHERE id = ? AND org_id = ? AND status IN ('draft', 'more_info_needed')
            "#,
        )
        .bind(input.title.as_deref().map(str::trim))
        .bind(&input.description)
        .bind(&input.business_justification)
        .bind(&input.category)
        .bind(input.priority)
        .bind(input.approval_type)
        .bind(input.estimated_cost)
        .bind(input.estimated_hours)
        .bind(affected_products)
        .bind(affected_departments)
        .bind(now)
        .bind(ecr_id)
        .bind(org_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            let current = self.require_ecr(org_id, ecr_id).await?;
            return Err(not_editable(EntityType::Ecr, ecr_id, current.status));
        }

        audit::append(
            &mut tx,
            org_id,
            actor_id,
            &EntityRef::new(EntityType::Ecr, ecr_id),
            AuditAction::Updated,
            serde_json::to_value(&input).map_err(StorageError::Json)?,
            now,
        )
        .await?;
        tx.commit().await?;

        self.require_ecr(org_id, ecr_id).await
    }

    // ---- ECO ----

    /// Create an ECO in `backlog`. Parent and linked ECRs must belong to `org_id`.
    pub async fn create_eco(
        &self,
        org_id: &str,
        actor_id: &str,
        input: EcoCreateInput,
    ) -> Result<Eco, WorkflowError> {
        input.validate().map_err(WorkflowError::Validation)?;

        let mut linked_ecr_ids = input.linked_ecr_ids.clone();
        linked_ecr_ids.sort();
        linked_ecr_ids.dedup();

        {
            let mut conn = self.pool.acquire().await?;
            if let Some(parent_id) = &input.parent_eco_id {
                storage::load_eco(&mut conn, org_id, parent_id)
                    .await
                    .map_err(|e| not_found_as(e, EntityType::Eco, parent_id))?;
            }
            let missing = storage::missing_ecrs(&mut conn, org_id, &linked_ecr_ids).await?;
            if let Some(first) = missing.first() {
                return Err(WorkflowError::not_found(EntityType::Ecr, first.clone()));
            }
        }

        let number = self.allocator.allocate(org_id, EntityType::Eco).await?;
        let eco_id = generate_id(EntityType::Eco.id_prefix());
        let lead_engineer_id = input
            .lead_engineer_id
            .clone()
            .unwrap_or_else(|| actor_id.to_string());
        let now = Utc::now();

        debug!("Creating ECO {} ({}) in org {}", number, eco_id, org_id);

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO ecos (
                id, org_id, eco_number, parent_eco_id, title, description,
                technical_details, lead_engineer_id, assigned_engineers, status,
                estimated_hours, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'backlog', ?, ?, ?)
            "#,
        )
        .bind(&eco_id)
        .bind(org_id)
        .bind(&number)
        .bind(&input.parent_eco_id)
        .bind(input.title.trim())
        .bind(&input.description)
        .bind(&input.technical_details)
        .bind(&lead_engineer_id)
        .bind(serde_json::to_string(&input.assigned_engineers).map_err(StorageError::Json)?)
        .bind(input.estimated_hours)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for ecr_id in &linked_ecr_ids {
            sqlx::query("INSERT INTO eco_linked_ecrs (eco_id, ecr_id) VALUES (?, ?)")
                .bind(&eco_id)
                .bind(ecr_id)
                .execute(&mut *tx)
                .await?;
        }

        audit::append(
            &mut tx,
            org_id,
            actor_id,
            &EntityRef::new(EntityType::Eco, &eco_id),
            AuditAction::Created,
            json!({
                "number": number,
                "status": EcoStatus::Backlog,
                "linkedEcrIds": linked_ecr_ids,
            }),
            now,
        )
        .await?;
        tx.commit().await?;

        info!("Created {} for org {}", number, org_id);
        self.require_eco(org_id, &eco_id).await
    }

    pub async fn start_eco(
        &self,
        org_id: &str,
        eco_id: &str,
        actor_id: &str,
    ) -> Result<Eco, WorkflowError> {
        self.move_eco(
            org_id,
            eco_id,
            Some(EcoStatus::Backlog),
            EcoStatus::InProgress,
            actor_id,
        )
        .await
    }

    pub async fn send_eco_to_review(
        &self,
        org_id: &str,
        eco_id: &str,
        actor_id: &str,
    ) -> Result<Eco, WorkflowError> {
        self.move_eco(org_id, eco_id, None, EcoStatus::Review, actor_id)
            .await
    }

    /// Completion is terminal and does not wait for ECNs, which follow the ECO
    pub async fn complete_eco(
        &self,
        org_id: &str,
        eco_id: &str,
        actor_id: &str,
    ) -> Result<Eco, WorkflowError> {
        self.move_eco(org_id, eco_id, None, EcoStatus::Completed, actor_id)
            .await
    }

    pub async fn hold_eco(
        &self,
        org_id: &str,
        eco_id: &str,
        actor_id: &str,
    ) -> Result<Eco, WorkflowError> {
        self.move_eco(org_id, eco_id, None, EcoStatus::OnHold, actor_id)
            .await
    }

    pub async fn resume_eco(
        &self,
        org_id: &str,
        eco_id: &str,
        actor_id: &str,
    ) -> Result<Eco, WorkflowError> {
        self.move_eco(
            org_id,
            eco_id,
            Some(EcoStatus::OnHold),
            EcoStatus::InProgress,
            actor_id,
        )
        .await
    }

    /// Move an ECO along any edge of its state graph
    pub async fn transition_eco(
        &self,
        org_id: &str,
        eco_id: &str,
        target: EcoStatus,
        actor_id: &str,
    ) -> Result<Eco, WorkflowError> {
        self.move_eco(org_id, eco_id, None, target, actor_id).await
    }

    async fn move_eco(
        &self,
        org_id: &str,
        eco_id: &str,
        expected_from: Option<EcoStatus>,
        target: EcoStatus,
        actor_id: &str,
    ) -> Result<Eco, WorkflowError> {
        let eco = self.require_eco(org_id, eco_id).await?;
        let expected = expected_from.map_or(true, |from| from == eco.status);
        if !expected || !eco.status.can_transition_to(target) {
            return Err(WorkflowError::invalid_transition(
                EntityType::Eco,
                eco.status,
                target,
            ));
        }

        let stamp = match (eco.status, target) {
            (EcoStatus::Backlog, EcoStatus::InProgress) => Some("started_at"),
            (_, EcoStatus::Completed) => Some("completed_at"),
            _ => None,
        };
        let write = StatusWrite {
            org_id,
            subject: EntityRef::new(EntityType::Eco, eco_id),
            column: "status",
            from: eco.status.as_str(),
            to: target.as_str(),
            stamp,
        };

        let now = Utc::now();
        let Some(tx) = self.begin_status_write(&write, now).await? else {
            let current = self.require_eco(org_id, eco_id).await?;
            return Err(WorkflowError::invalid_transition(
                EntityType::Eco,
                current.status,
                target,
            ));
        };
        self.finish_status_write(tx, &write, actor_id, now).await?;

        let updated = self.require_eco(org_id, eco_id).await?;
        info!(
            "{} moved {} -> {} by {}",
            updated.eco_number, eco.status, target, actor_id
        );
        Ok(updated)
    }

    /// Edit descriptive fields of an ECO that is not yet completed
    pub async fn update_eco(
        &self,
        org_id: &str,
        eco_id: &str,
        actor_id: &str,
        input: EcoUpdateInput,
    ) -> Result<Eco, WorkflowError> {
        input.validate().map_err(WorkflowError::Validation)?;

        let eco = self.require_eco(org_id, eco_id).await?;
        if eco.status == EcoStatus::Completed {
            return Err(not_editable(EntityType::Eco, eco_id, eco.status));
        }

        let assigned_engineers = input
            .assigned_engineers
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(StorageError::Json)?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            r#"
            UPDATE ecos SET
                title = COALESCE(?, title),
                description = COALESCE(?, description),
                technical_details = COALESCE(?, technical_details),
                lead_engineer_id = COALESCE(?, lead_engineer_id),
                assigned_engineers = COALESCE(?, assigned_engineers),
                estimated_hours = COALESCE(?, estimated_hours),
                actual_hours = COALESCE(?, actual_hours),
                implementation_notes = COALESCE(?, implementation_notes),
                updated_at = ?
            WHERE id = ? AND org_id = ? AND status != 'completed'
            "#,
        )
        .bind(input.title.as_deref().map(str::trim))
        .bind(&input.description)
        .bind(&input.technical_details)
        .bind(&input.lead_engineer_id)
        .bind(assigned_engineers)
        .bind(input.estimated_hours)
        .bind(input.actual_hours)
        .bind(&input.implementation_notes)
        .bind(now)
        .bind(eco_id)
        .bind(org_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            let current = self.require_eco(org_id, eco_id).await?;
            return Err(not_editable(EntityType::Eco, eco_id, current.status));
        }

        audit::append(
            &mut tx,
            org_id,
            actor_id,
            &EntityRef::new(EntityType::Eco, eco_id),
            AuditAction::Updated,
            serde_json::to_value(&input).map_err(StorageError::Json)?,
            now,
        )
        .await?;
        tx.commit().await?;

        self.require_eco(org_id, eco_id).await
    }

    // ---- ECN ----

    /// Issue an ECN against an ECO of the same organization.
    ///
    /// Notification-only notices start out approved; review-required ones
    /// start pending.
    pub async fn create_ecn(
        &self,
        org_id: &str,
        actor_id: &str,
        input: EcnCreateInput,
    ) -> Result<Ecn, WorkflowError> {
        input.validate().map_err(WorkflowError::Validation)?;

        self.require_eco(org_id, &input.eco_id).await?;

        let notification_type = input.notification_type.unwrap_or_default();
        let approval_status = match notification_type {
            NotificationType::ReviewRequired => EcnApprovalStatus::Pending,
            NotificationType::NotificationOnly => EcnApprovalStatus::Approved,
        };

        let number = self.allocator.allocate(org_id, EntityType::Ecn).await?;
        let ecn_id = generate_id(EntityType::Ecn.id_prefix());
        let now = Utc::now();

        debug!("Creating ECN {} ({}) for ECO {}", number, ecn_id, input.eco_id);

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO ecns (
                id, org_id, ecn_number, eco_id, title, implementation_instructions,
                notification_type, affected_departments, approval_status,
                implementation_status, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'waiting', ?, ?)
            "#,
        )
        .bind(&ecn_id)
        .bind(org_id)
        .bind(&number)
        .bind(&input.eco_id)
        .bind(input.title.trim())
        .bind(&input.implementation_instructions)
        .bind(notification_type)
        .bind(serde_json::to_string(&input.affected_departments).map_err(StorageError::Json)?)
        .bind(approval_status)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        audit::append(
            &mut tx,
            org_id,
            actor_id,
            &EntityRef::new(EntityType::Ecn, &ecn_id),
            AuditAction::Created,
            json!({
                "number": number,
                "ecoId": input.eco_id,
                "notificationType": notification_type,
                "implementationStatus": ImplementationStatus::Waiting,
            }),
            now,
        )
        .await?;
        tx.commit().await?;

        info!("Created {} for org {}", number, org_id);
        self.require_ecn(org_id, &ecn_id).await
    }

    /// Step implementation forward by exactly one state
    pub async fn advance_ecn_implementation(
        &self,
        org_id: &str,
        ecn_id: &str,
        target: ImplementationStatus,
        actor_id: &str,
    ) -> Result<Ecn, WorkflowError> {
        let ecn = self.require_ecn(org_id, ecn_id).await?;
        if !ecn.implementation_status.can_transition_to(target) {
            return Err(WorkflowError::invalid_transition(
                EntityType::Ecn,
                ecn.implementation_status,
                target,
            ));
        }
        if ecn.implementation_status == ImplementationStatus::Waiting
            && !ecn.is_cleared_for_implementation()
        {
            return Err(WorkflowError::ApprovalRequired {
                entity: EntityType::Ecn,
                id: ecn_id.to_string(),
            });
        }

        let write = StatusWrite {
            org_id,
            subject: EntityRef::new(EntityType::Ecn, ecn_id),
            column: "implementation_status",
            from: ecn.implementation_status.as_str(),
            to: target.as_str(),
            stamp: (target == ImplementationStatus::Completed).then_some("implemented_at"),
        };

        let now = Utc::now();
        let Some(tx) = self.begin_status_write(&write, now).await? else {
            let current = self.require_ecn(org_id, ecn_id).await?;
            return Err(WorkflowError::invalid_transition(
                EntityType::Ecn,
                current.implementation_status,
                target,
            ));
        };
        self.finish_status_write(tx, &write, actor_id, now).await?;

        let updated = self.require_ecn(org_id, ecn_id).await?;
        info!(
            "{} implementation {} -> {} by {}",
            updated.ecn_number, ecn.implementation_status, target, actor_id
        );
        Ok(updated)
    }

    /// Record the review outcome of a `review_required` ECN
    pub async fn resolve_ecn_approval(
        &self,
        org_id: &str,
        ecn_id: &str,
        decision: EcnApprovalDecision,
        actor_id: &str,
    ) -> Result<Ecn, WorkflowError> {
        let target = EcnApprovalStatus::from(decision);
        let ecn = self.require_ecn(org_id, ecn_id).await?;
        if ecn.notification_type != NotificationType::ReviewRequired
            || !ecn.approval_status.can_transition_to(target)
        {
            return Err(WorkflowError::invalid_transition(
                EntityType::Ecn,
                ecn.approval_status,
                target,
            ));
        }

        let write = StatusWrite {
            org_id,
            subject: EntityRef::new(EntityType::Ecn, ecn_id),
            column: "approval_status",
            from: ecn.approval_status.as_str(),
            to: target.as_str(),
            stamp: Some("approval_resolved_at"),
        };

        let now = Utc::now();
        let Some(tx) = self.begin_status_write(&write, now).await? else {
            let current = self.require_ecn(org_id, ecn_id).await?;
            return Err(WorkflowError::invalid_transition(
                EntityType::Ecn,
                current.approval_status,
                target,
            ));
        };
        self.finish_status_write(tx, &write, actor_id, now).await?;

        let updated = self.require_ecn(org_id, ecn_id).await?;
        info!("{} review {} by {}", updated.ecn_number, target, actor_id);

        let eco = self.require_eco(org_id, &updated.eco_id).await?;
        notify_best_effort(
            self.notifier.as_ref(),
            NotificationCreateInput {
                org_id: org_id.to_string(),
                user_id: eco.lead_engineer_id,
                subject: Some(write.subject.clone()),
                kind: NotificationKind::EcnApprovalResolved,
                title: format!("{} was {}", updated.ecn_number, target),
                message: Some(updated.title.clone()),
            },
        )
        .await;

        Ok(updated)
    }

    // ---- shared ----

    /// Open a transaction and apply the guarded status update.
    ///
    /// The update is the first statement so SQLite takes the write lock before
    /// reading. Returns `None` (after rolling back) when the row no longer
    /// holds `write.from`.
    async fn begin_status_write(
        &self,
        write: &StatusWrite<'_>,
        now: DateTime<Utc>,
    ) -> Result<Option<Transaction<'static, Sqlite>>, WorkflowError> {
        let stamp = write
            .stamp
            .map(|column| format!(", {} = ?", column))
            .unwrap_or_default();
        let sql = format!(
            "UPDATE {table} SET {column} = ?, updated_at = ?{stamp} WHERE id = ? AND org_id = ? AND {column} = ?",
            table = write.table(),
            column = write.column,
        );

        let mut tx = self.pool.begin().await?;
        let mut query = sqlx::query(&sql).bind(write.to).bind(now);
        if write.stamp.is_some() {
            query = query.bind(now);
        }
        let result = query
            .bind(&write.subject.entity_id)
            .bind(write.org_id)
            .bind(write.from)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            debug!(
                "Guarded update of {} {} from {} found nothing",
                write.subject, write.column, write.from
            );
            tx.rollback().await?;
            return Ok(None);
        }

        Ok(Some(tx))
    }

    async fn finish_status_write(
        &self,
        mut tx: Transaction<'static, Sqlite>,
        write: &StatusWrite<'_>,
        actor_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), WorkflowError> {
        audit::append(
            &mut tx,
            write.org_id,
            actor_id,
            &write.subject,
            AuditAction::StatusChanged,
            field_change(write.column, write.from, write.to),
            now,
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn require_ecr(&self, org_id: &str, ecr_id: &str) -> Result<Ecr, WorkflowError> {
        self.storage
            .get_ecr(org_id, ecr_id)
            .await
            .map_err(|e| not_found_as(e, EntityType::Ecr, ecr_id))
    }

    async fn require_eco(&self, org_id: &str, eco_id: &str) -> Result<Eco, WorkflowError> {
        self.storage
            .get_eco(org_id, eco_id)
            .await
            .map_err(|e| not_found_as(e, EntityType::Eco, eco_id))
    }

    async fn require_ecn(&self, org_id: &str, ecn_id: &str) -> Result<Ecn, WorkflowError> {
        self.storage
            .get_ecn(org_id, ecn_id)
            .await
            .map_err(|e| not_found_as(e, EntityType::Ecn, ecn_id))
    }
}

/// Insert a pending level-1 approval for each board member on an ECR.
/// Members already holding a pending approval are skipped. Returns the
/// members that received a new approval.
async fn open_board_approvals(
    conn: &mut SqliteConnection,
    org_id: &str,
    ecr_id: &str,
    board: &[String],
    now: DateTime<Utc>,
) -> Result<Vec<String>, WorkflowError> {
    let mut opened = Vec::with_capacity(board.len());
    for member in board {
        let result = sqlx::query(
            r#"
            INSERT INTO approvals (
                id, org_id, entity_type, entity_id, approver_id,
                approval_level, status, created_at
            ) VALUES (?, ?, 'ECR', ?, ?, 1, 'pending', ?)
            ON CONFLICT (entity_type, entity_id, approver_id, approval_level)
                WHERE status = 'pending' DO NOTHING
            "#,
        )
        .bind(generate_id("apr"))
        .bind(org_id)
        .bind(ecr_id)
        .bind(member)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 1 {
            opened.push(member.clone());
        } else {
            debug!("Board member {} already reviewing {}", member, ecr_id);
        }
    }

    if !board.is_empty() {
        info!("Opened {} board approvals on {}", opened.len(), ecr_id);
    }
    Ok(opened)
}

fn not_found_as(err: StorageError, entity: EntityType, id: &str) -> WorkflowError {
    match err {
        StorageError::NotFound => WorkflowError::not_found(entity, id),
        other => WorkflowError::Storage(other),
    }
}

fn not_editable(entity: EntityType, id: &str, status: impl ToString) -> WorkflowError {
    WorkflowError::NotEditable {
        entity,
        id: id.to_string(),
        status: status.to_string(),
    }
}
