// ABOUTME: Read-side storage for ECR, ECO and ECN records
// ABOUTME: Organization-scoped lookups, paginated listings, and subject resolution

use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::debug;

use ecflow_core::pagination::{PaginatedResponse, PaginationParams};
use ecflow_core::{EntityRef, EntityType};
use ecflow_storage::StorageError;

use crate::audit::AuditEntry;
use crate::types::{
    Ecn, Eco, EcoStatus, Ecr, EcrStatus, ImplementationStatus, NotificationType,
};

const ECO_COLUMNS: &str = r#"
    ecos.*,
    (SELECT json_group_array(ecr_id) FROM eco_linked_ecrs l WHERE l.eco_id = ecos.id) AS linked_ecr_ids
"#;

/// What other packages need to know about an approval or comment subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectSummary {
    pub subject: EntityRef,
    pub org_id: String,
    pub number: String,
    pub title: String,
    /// ECR requestor, ECO lead engineer, or the lead engineer of the ECN's ECO
    pub owner_id: String,
    /// False only for notification-only ECNs
    pub requires_review: bool,
}

pub struct WorkflowStorage {
    pool: SqlitePool,
}

impl WorkflowStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_ecr(&self, org_id: &str, ecr_id: &str) -> Result<Ecr, StorageError> {
        let mut conn = self.pool.acquire().await.map_err(StorageError::Sqlx)?;
        load_ecr(&mut conn, org_id, ecr_id).await
    }

    pub async fn get_eco(&self, org_id: &str, eco_id: &str) -> Result<Eco, StorageError> {
        let mut conn = self.pool.acquire().await.map_err(StorageError::Sqlx)?;
        load_eco(&mut conn, org_id, eco_id).await
    }

    pub async fn get_ecn(&self, org_id: &str, ecn_id: &str) -> Result<Ecn, StorageError> {
        let mut conn = self.pool.acquire().await.map_err(StorageError::Sqlx)?;
        load_ecn(&mut conn, org_id, ecn_id).await
    }

    pub async fn list_ecrs(
        &self,
        org_id: &str,
        status: Option<EcrStatus>,
        params: &PaginationParams,
    ) -> Result<PaginatedResponse<Ecr>, StorageError> {
        debug!("Listing ECRs for org: {} (status: {:?})", org_id, status);

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM ecrs WHERE org_id = ? AND (? IS NULL OR status = ?)",
        )
        .bind(org_id)
        .bind(status)
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        let rows = sqlx::query(
            r#"
            SELECT * FROM ecrs
            WHERE org_id = ? AND (? IS NULL OR status = ?)
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(org_id)
        .bind(status)
        .bind(status)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        let ecrs = rows.iter().map(row_to_ecr).collect::<Result<Vec<_>, _>>()?;
        Ok(PaginatedResponse::new(ecrs, params, total))
    }

    pub async fn list_ecos(
        &self,
        org_id: &str,
        status: Option<EcoStatus>,
        params: &PaginationParams,
    ) -> Result<PaginatedResponse<Eco>, StorageError> {
        debug!("Listing ECOs for org: {} (status: {:?})", org_id, status);

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM ecos WHERE org_id = ? AND (? IS NULL OR status = ?)",
        )
        .bind(org_id)
        .bind(status)
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {ECO_COLUMNS} FROM ecos
            WHERE org_id = ? AND (? IS NULL OR status = ?)
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#
        ))
        .bind(org_id)
        .bind(status)
        .bind(status)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        let ecos = rows.iter().map(row_to_eco).collect::<Result<Vec<_>, _>>()?;
        Ok(PaginatedResponse::new(ecos, params, total))
    }

    /// ECNs filtered by implementation status
    pub async fn list_ecns(
        &self,
        org_id: &str,
        status: Option<ImplementationStatus>,
        params: &PaginationParams,
    ) -> Result<PaginatedResponse<Ecn>, StorageError> {
        debug!("Listing ECNs for org: {} (status: {:?})", org_id, status);

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM ecns WHERE org_id = ? AND (? IS NULL OR implementation_status = ?)",
        )
        .bind(org_id)
        .bind(status)
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        let rows = sqlx::query(
            r#"
            SELECT * FROM ecns
            WHERE org_id = ? AND (? IS NULL OR implementation_status = ?)
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(org_id)
        .bind(status)
        .bind(status)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        let ecns = rows.iter().map(row_to_ecn).collect::<Result<Vec<_>, _>>()?;
        Ok(PaginatedResponse::new(ecns, params, total))
    }

    pub async fn list_ecns_for_eco(
        &self,
        org_id: &str,
        eco_id: &str,
    ) -> Result<Vec<Ecn>, StorageError> {
        let rows = sqlx::query(
            "SELECT * FROM ecns WHERE org_id = ? AND eco_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(org_id)
        .bind(eco_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        rows.iter().map(row_to_ecn).collect()
    }

    /// Resolve a polymorphic reference within an organization.
    ///
    /// A subject owned by another organization is reported as `NotFound`.
    pub async fn subject_summary(
        &self,
        org_id: &str,
        subject: &EntityRef,
    ) -> Result<SubjectSummary, StorageError> {
        let mut conn = self.pool.acquire().await.map_err(StorageError::Sqlx)?;

        let (number, title, owner_id, requires_review) = match subject.entity_type {
            EntityType::Ecr => {
                let ecr = load_ecr(&mut conn, org_id, &subject.entity_id).await?;
                (ecr.ecr_number, ecr.title, ecr.requestor_id, true)
            }
            EntityType::Eco => {
                let eco = load_eco(&mut conn, org_id, &subject.entity_id).await?;
                (eco.eco_number, eco.title, eco.lead_engineer_id, true)
            }
            EntityType::Ecn => {
                let ecn = load_ecn(&mut conn, org_id, &subject.entity_id).await?;
                let eco = load_eco(&mut conn, org_id, &ecn.eco_id).await?;
                (
                    ecn.ecn_number,
                    ecn.title,
                    eco.lead_engineer_id,
                    ecn.notification_type == NotificationType::ReviewRequired,
                )
            }
        };

        Ok(SubjectSummary {
            subject: subject.clone(),
            org_id: org_id.to_string(),
            number,
            title,
            owner_id,
            requires_review,
        })
    }

    /// Audit entries for one record, oldest first
    pub async fn audit_trail(
        &self,
        org_id: &str,
        subject: &EntityRef,
    ) -> Result<Vec<AuditEntry>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM audit_log
            WHERE org_id = ? AND entity_type = ? AND entity_id = ?
            ORDER BY seq ASC
            "#,
        )
        .bind(org_id)
        .bind(subject.entity_type)
        .bind(&subject.entity_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        rows.iter()
            .map(|row| {
                let changes: Option<String> = row.try_get("changes").map_err(StorageError::Sqlx)?;
                Ok(AuditEntry {
                    id: row.try_get("id").map_err(StorageError::Sqlx)?,
                    org_id: row.try_get("org_id").map_err(StorageError::Sqlx)?,
                    user_id: row.try_get("user_id").map_err(StorageError::Sqlx)?,
                    subject: EntityRef::new(
                        row.try_get("entity_type").map_err(StorageError::Sqlx)?,
                        row.try_get::<String, _>("entity_id")
                            .map_err(StorageError::Sqlx)?,
                    ),
                    action: row.try_get("action").map_err(StorageError::Sqlx)?,
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

pub(crate) async fn load_ecr(
    conn: &mut SqliteConnection,
    org_id: &str,
    ecr_id: &str,
) -> Result<Ecr, StorageError> {
    let row = sqlx::query("SELECT * FROM ecrs WHERE id = ? AND org_id = ?")
        .bind(ecr_id)
        .bind(org_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(StorageError::Sqlx)?
        .ok_or(StorageError::NotFound)?;

    row_to_ecr(&row)
}

pub(crate) async fn load_eco(
    conn: &mut SqliteConnection,
    org_id: &str,
    eco_id: &str,
) -> Result<Eco, StorageError> {
    let row = sqlx::query(&format!(
        "SELECT {ECO_COLUMNS} FROM ecos WHERE id = ? AND org_id = ?"
    ))
    .bind(eco_id)
    .bind(org_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(StorageError::Sqlx)?
    .ok_or(StorageError::NotFound)?;

    row_to_eco(&row)
}

pub(crate) async fn load_ecn(
    conn: &mut SqliteConnection,
    org_id: &str,
    ecn_id: &str,
) -> Result<Ecn, StorageError> {
    let row = sqlx::query("SELECT * FROM ecns WHERE id = ? AND org_id = ?")
        .bind(ecn_id)
        .bind(org_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(StorageError::Sqlx)?
        .ok_or(StorageError::NotFound)?;

    row_to_ecn(&row)
}

/// Ids from `ids` that are not ECRs of `org_id`
pub(crate) async fn missing_ecrs(
    conn: &mut SqliteConnection,
    org_id: &str,
    ids: &[String],
) -> Result<Vec<String>, StorageError> {
    let mut missing = Vec::new();
    for id in ids {
        let found: Option<String> =
            sqlx::query_scalar("SELECT id FROM ecrs WHERE id = ? AND org_id = ?")
                .bind(id)
                .bind(org_id)
                .fetch_optional(&mut *conn)
                .await
                .map_err(StorageError::Sqlx)?;
        if found.is_none() {
            missing.push(id.clone());
        }
    }
    Ok(missing)
}

fn string_list(row: &SqliteRow, column: &str) -> Result<Vec<String>, StorageError> {
    let raw: Option<String> = row.try_get(column).map_err(StorageError::Sqlx)?;
    match raw {
        Some(json) if !json.is_empty() => Ok(serde_json::from_str(&json)?),
        _ => Ok(Vec::new()),
    }
}

fn row_to_ecr(row: &SqliteRow) -> Result<Ecr, StorageError> {
    Ok(Ecr {
        id: row.try_get("id").map_err(StorageError::Sqlx)?,
        org_id: row.try_get("org_id").map_err(StorageError::Sqlx)?,
        ecr_number: row.try_get("ecr_number").map_err(StorageError::Sqlx)?,
        title: row.try_get("title").map_err(StorageError::Sqlx)?,
        description: row.try_get("description").map_err(StorageError::Sqlx)?,
        business_justification: row
            .try_get("business_justification")
            .map_err(StorageError::Sqlx)?,
        requestor_id: row.try_get("requestor_id").map_err(StorageError::Sqlx)?,
        category: row.try_get("category").map_err(StorageError::Sqlx)?,
        priority: row.try_get("priority").map_err(StorageError::Sqlx)?,
        status: row.try_get("status").map_err(StorageError::Sqlx)?,
        approval_type: row.try_get("approval_type").map_err(StorageError::Sqlx)?,
        estimated_cost: row.try_get("estimated_cost").map_err(StorageError::Sqlx)?,
        estimated_hours: row.try_get("estimated_hours").map_err(StorageError::Sqlx)?,
        affected_products: string_list(row, "affected_products")?,
        affected_departments: string_list(row, "affected_departments")?,
        created_at: row.try_get("created_at").map_err(StorageError::Sqlx)?,
        updated_at: row.try_get("updated_at").map_err(StorageError::Sqlx)?,
        submitted_at: row.try_get("submitted_at").map_err(StorageError::Sqlx)?,
        resolved_at: row.try_get("resolved_at").map_err(StorageError::Sqlx)?,
    })
}

fn row_to_eco(row: &SqliteRow) -> Result<Eco, StorageError> {
    let mut linked_ecr_ids = string_list(row, "linked_ecr_ids")?;
    linked_ecr_ids.sort();

    Ok(Eco {
        id: row.try_get("id").map_err(StorageError::Sqlx)?,
        org_id: row.try_get("org_id").map_err(StorageError::Sqlx)?,
        eco_number: row.try_get("eco_number").map_err(StorageError::Sqlx)?,
        parent_eco_id: row.try_get("parent_eco_id").map_err(StorageError::Sqlx)?,
        title: row.try_get("title").map_err(StorageError::Sqlx)?,
        description: row.try_get("description").map_err(StorageError::Sqlx)?,
        technical_details: row.try_get("technical_details").map_err(StorageError::Sqlx)?,
        lead_engineer_id: row.try_get("lead_engineer_id").map_err(StorageError::Sqlx)?,
        assigned_engineers: string_list(row, "assigned_engineers")?,
        status: row.try_get("status").map_err(StorageError::Sqlx)?,
        estimated_hours: row.try_get("estimated_hours").map_err(StorageError::Sqlx)?,
        actual_hours: row.try_get("actual_hours").map_err(StorageError::Sqlx)?,
        implementation_notes: row
            .try_get("implementation_notes")
            .map_err(StorageError::Sqlx)?,
        linked_ecr_ids,
        created_at: row.try_get("created_at").map_err(StorageError::Sqlx)?,
        updated_at: row.try_get("updated_at").map_err(StorageError::Sqlx)?,
        started_at: row.try_get("started_at").map_err(StorageError::Sqlx)?,
        completed_at: row.try_get("completed_at").map_err(StorageError::Sqlx)?,
    })
}

fn row_to_ecn(row: &SqliteRow) -> Result<Ecn, StorageError> {
    Ok(Ecn {
        id: row.try_get("id").map_err(StorageError::Sqlx)?,
        org_id: row.try_get("org_id").map_err(StorageError::Sqlx)?,
        ecn_number: row.try_get("ecn_number").map_err(StorageError::Sqlx)?,
        eco_id: row.try_get("eco_id").map_err(StorageError::Sqlx)?,
        title: row.try_get("title").map_err(StorageError::Sqlx)?,
        implementation_instructions: row
            .try_get("implementation_instructions")
            .map_err(StorageError::Sqlx)?,
        notification_type: row.try_get("notification_type").map_err(StorageError::Sqlx)?,
        affected_departments: string_list(row, "affected_departments")?,
        approval_status: row.try_get("approval_status").map_err(StorageError::Sqlx)?,
        implementation_status: row
            .try_get("implementation_status")
            .map_err(StorageError::Sqlx)?,
        created_at: row.try_get("created_at").map_err(StorageError::Sqlx)?,
        updated_at: row.try_get("updated_at").map_err(StorageError::Sqlx)?,
        approval_resolved_at: row
            .try_get("approval_resolved_at")
            .map_err(StorageError::Sqlx)?,
        implemented_at: row.try_get("implemented_at").map_err(StorageError::Sqlx)?,
    })
}
