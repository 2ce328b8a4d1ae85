// ABOUTME: Organization storage layer using SQLite
// ABOUTME: Handles tenant records, membership, and change review board lookup

use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use ecflow_core::generate_id;
use ecflow_storage::StorageError;

use crate::types::{
    MemberCreateInput, Organization, OrganizationCreateInput, OrganizationMember,
    OrganizationSettings,
};

pub struct OrganizationStorage {
    pool: SqlitePool,
}

impl OrganizationStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_organization(
        &self,
        input: OrganizationCreateInput,
    ) -> Result<Organization, StorageError> {
        let org_id = generate_id("org");
        let settings = input.settings.unwrap_or_default();
        let approval_levels = serde_json::to_string(&settings.approval_levels)?;

        debug!("Creating organization: {} ({})", input.name, input.subdomain);

        sqlx::query(
            r#"
            INSERT INTO organizations (
                id, name, subdomain, plan_type,
                enable_change_review_board, approval_levels, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&org_id)
        .bind(&input.name)
        .bind(input.subdomain.to_lowercase())
        .bind(input.plan_type.unwrap_or_default())
        .bind(settings.enable_change_review_board)
        .bind(approval_levels)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        self.get_organization(&org_id).await
    }

    pub async fn get_organization(&self, org_id: &str) -> Result<Organization, StorageError> {
        let row = sqlx::query("SELECT * FROM organizations WHERE id = ?")
            .bind(org_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?
            .ok_or(StorageError::NotFound)?;

        self.row_to_organization(&row)
    }

    pub async fn get_by_subdomain(&self, subdomain: &str) -> Result<Organization, StorageError> {
        let row = sqlx::query("SELECT * FROM organizations WHERE subdomain = ?")
            .bind(subdomain.to_lowercase())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?
            .ok_or(StorageError::NotFound)?;

        self.row_to_organization(&row)
    }

    pub async fn update_settings(
        &self,
        org_id: &str,
        settings: OrganizationSettings,
    ) -> Result<Organization, StorageError> {
        debug!("Updating settings for organization: {}", org_id);

        let result = sqlx::query(
            "UPDATE organizations SET enable_change_review_board = ?, approval_levels = ? WHERE id = ?",
        )
        .bind(settings.enable_change_review_board)
        .bind(serde_json::to_string(&settings.approval_levels)?)
        .bind(org_id)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        self.get_organization(org_id).await
    }

    /// Add a user to an organization. A user can hold one membership per org.
    pub async fn add_member(
        &self,
        org_id: &str,
        input: MemberCreateInput,
    ) -> Result<OrganizationMember, StorageError> {
        let member_id = generate_id("mem");

        debug!("Adding member {} to organization {}", input.user_id, org_id);

        sqlx::query(
            r#"
            INSERT INTO organization_members (
                id, org_id, user_id, role, department, is_active, created_at
            ) VALUES (?, ?, ?, ?, ?, 1, ?)
            "#,
        )
        .bind(&member_id)
        .bind(org_id)
        .bind(&input.user_id)
        .bind(input.role.unwrap_or_default())
        .bind(&input.department)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        self.get_member(org_id, &input.user_id).await
    }

    pub async fn get_member(
        &self,
        org_id: &str,
        user_id: &str,
    ) -> Result<OrganizationMember, StorageError> {
        let row = sqlx::query("SELECT * FROM organization_members WHERE org_id = ? AND user_id = ?")
            .bind(org_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?
            .ok_or(StorageError::NotFound)?;

        self.row_to_member(&row)
    }

    pub async fn list_members(&self, org_id: &str) -> Result<Vec<OrganizationMember>, StorageError> {
        let rows = sqlx::query(
            "SELECT * FROM organization_members WHERE org_id = ? ORDER BY created_at ASC, user_id ASC",
        )
        .bind(org_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        rows.iter().map(|row| self.row_to_member(row)).collect()
    }

    pub async fn set_member_active(
        &self,
        org_id: &str,
        user_id: &str,
        is_active: bool,
    ) -> Result<OrganizationMember, StorageError> {
        let result = sqlx::query(
            "UPDATE organization_members SET is_active = ? WHERE org_id = ? AND user_id = ?",
        )
        .bind(is_active)
        .bind(org_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        self.get_member(org_id, user_id).await
    }

    /// User ids of the active admins and engineering managers
    pub async fn review_board(&self, org_id: &str) -> Result<Vec<String>, StorageError> {
        sqlx::query_scalar(
            r#"
            SELECT user_id FROM organization_members
            WHERE org_id = ? AND is_active = 1
              AND role IN ('admin', 'engineering_manager')
            ORDER BY user_id ASC
            "#,
        )
        .bind(org_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Sqlx)
    }

    fn row_to_organization(
        &self,
        row: &sqlx::sqlite::SqliteRow,
    ) -> Result<Organization, StorageError> {
        let approval_levels: Option<String> =
            row.try_get("approval_levels").map_err(StorageError::Sqlx)?;
        let approval_levels = match approval_levels {
            Some(json) => serde_json::from_str(&json)?,
            None => Vec::new(),
        };

        Ok(Organization {
            id: row.try_get("id").map_err(StorageError::Sqlx)?,
            name: row.try_get("name").map_err(StorageError::Sqlx)?,
            subdomain: row.try_get("subdomain").map_err(StorageError::Sqlx)?,
            plan_type: row.try_get("plan_type").map_err(StorageError::Sqlx)?,
            settings: OrganizationSettings {
                enable_change_review_board: row
                    .try_get("enable_change_review_board")
                    .map_err(StorageError::Sqlx)?,
                approval_levels,
            },
            created_at: row.try_get("created_at").map_err(StorageError::Sqlx)?,
        })
    }

    fn row_to_member(
        &self,
        row: &sqlx::sqlite::SqliteRow,
    ) -> Result<OrganizationMember, StorageError> {
        Ok(OrganizationMember {
            id: row.try_get("id").map_err(StorageError::Sqlx)?,
            org_id: row.try_get("org_id").map_err(StorageError::Sqlx)?,
            user_id: row.try_get("user_id").map_err(StorageError::Sqlx)?,
            role: row.try_get("role").map_err(StorageError::Sqlx)?,
            department: row.try_get("department").map_err(StorageError::Sqlx)?,
            is_active: row.try_get("is_active").map_err(StorageError::Sqlx)?,
            created_at: row.try_get("created_at").map_err(StorageError::Sqlx)?,
        })
    }
}
