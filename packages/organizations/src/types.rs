// ABOUTME: Organization type definitions
// ABOUTME: Structures for tenants, plan tiers, settings, and role-bearing memberships

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    #[default]
    Starter,
    Professional,
    Enterprise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Admin,
    EngineeringManager,
    Engineer,
    #[default]
    Requestor,
    Viewer,
}

impl MemberRole {
    /// Roles that sit on the change review board
    pub fn is_board_member(&self) -> bool {
        matches!(self, MemberRole::Admin | MemberRole::EngineeringManager)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationSettings {
    #[serde(rename = "enableChangeReviewBoard")]
    pub enable_change_review_board: bool,
    #[serde(rename = "approvalLevels", default)]
    pub approval_levels: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub subdomain: String,
    #[serde(rename = "planType")]
    pub plan_type: PlanType,
    pub settings: OrganizationSettings,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationCreateInput {
    pub name: String,
    pub subdomain: String,
    pub plan_type: Option<PlanType>,
    pub settings: Option<OrganizationSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationMember {
    pub id: String,
    #[serde(rename = "orgId")]
    pub org_id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub role: MemberRole,
    pub department: Option<String>,
    #[serde(rename = "isActive")]
    pub is_active: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberCreateInput {
    pub user_id: String,
    pub role: Option<MemberRole>,
    pub department: Option<String>,
}
