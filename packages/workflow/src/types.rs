// ABOUTME: ECR, ECO and ECN type definitions
// ABOUTME: Records, lifecycle status enums, and the create/update inputs accepted by the engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use ecflow_core::constants::MAX_TITLE_LENGTH;
use ecflow_core::{Priority, ValidationError, Validator};

const MAX_TEXT_LENGTH: usize = 10_000;
const MAX_CATEGORY_LENGTH: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EcrStatus {
    Draft,
    Submitted,
    UnderReview,
    Approved,
    Rejected,
    MoreInfoNeeded,
    CrbReview,
}

impl EcrStatus {
    pub const ALL: [EcrStatus; 7] = [
        EcrStatus::Draft,
        EcrStatus::Submitted,
        EcrStatus::UnderReview,
        EcrStatus::Approved,
        EcrStatus::Rejected,
        EcrStatus::MoreInfoNeeded,
        EcrStatus::CrbReview,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EcrStatus::Draft => "draft",
            EcrStatus::Submitted => "submitted",
            EcrStatus::UnderReview => "under_review",
            EcrStatus::Approved => "approved",
            EcrStatus::Rejected => "rejected",
            EcrStatus::MoreInfoNeeded => "more_info_needed",
            EcrStatus::CrbReview => "crb_review",
        }
    }

    /// Descriptive fields may only change while the requestor owns the draft
    pub fn is_editable(&self) -> bool {
        matches!(self, EcrStatus::Draft | EcrStatus::MoreInfoNeeded)
    }

    pub fn is_resolution(&self) -> bool {
        matches!(self, EcrStatus::Approved | EcrStatus::Rejected)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EcoStatus {
    Backlog,
    InProgress,
    Review,
    Completed,
    OnHold,
}

impl EcoStatus {
    pub const ALL: [EcoStatus; 5] = [
        EcoStatus::Backlog,
        EcoStatus::InProgress,
        EcoStatus::Review,
        EcoStatus::Completed,
        EcoStatus::OnHold,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EcoStatus::Backlog => "backlog",
            EcoStatus::InProgress => "in_progress",
            EcoStatus::Review => "review",
            EcoStatus::Completed => "completed",
            EcoStatus::OnHold => "on_hold",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ImplementationStatus {
    Waiting,
    InProgress,
    Completed,
}

impl ImplementationStatus {
    pub const ALL: [ImplementationStatus; 3] = [
        ImplementationStatus::Waiting,
        ImplementationStatus::InProgress,
        ImplementationStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImplementationStatus::Waiting => "waiting",
            ImplementationStatus::InProgress => "in_progress",
            ImplementationStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EcnApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl EcnApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EcnApprovalStatus::Pending => "pending",
            EcnApprovalStatus::Approved => "approved",
            EcnApprovalStatus::Rejected => "rejected",
        }
    }
}

/// Outcome of an ECN review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EcnApprovalDecision {
    Approved,
    Rejected,
}

impl From<EcnApprovalDecision> for EcnApprovalStatus {
    fn from(decision: EcnApprovalDecision) -> Self {
        match decision {
            EcnApprovalDecision::Approved => EcnApprovalStatus::Approved,
            EcnApprovalDecision::Rejected => EcnApprovalStatus::Rejected,
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(EcrStatus, EcoStatus, ImplementationStatus, EcnApprovalStatus);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApprovalType {
    #[default]
    ManagerOnly,
    ChangeReviewBoard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    ReviewRequired,
    #[default]
    NotificationOnly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ecr {
    pub id: String,
    pub org_id: String,
    pub ecr_number: String,
    pub title: String,
    pub description: Option<String>,
    pub business_justification: Option<String>,
    pub requestor_id: String,
    pub category: Option<String>,
    pub priority: Priority,
    pub status: EcrStatus,
    pub approval_type: ApprovalType,
    pub estimated_cost: Option<i64>,
    pub estimated_hours: Option<i64>,
    pub affected_products: Vec<String>,
    pub affected_departments: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eco {
    pub id: String,
    pub org_id: String,
    pub eco_number: String,
    pub parent_eco_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub technical_details: Option<String>,
    pub lead_engineer_id: String,
    pub assigned_engineers: Vec<String>,
    pub status: EcoStatus,
    pub estimated_hours: Option<i64>,
    pub actual_hours: Option<i64>,
    pub implementation_notes: Option<String>,
    pub linked_ecr_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ecn {
    pub id: String,
    pub org_id: String,
    pub ecn_number: String,
    pub eco_id: String,
    pub title: String,
    pub implementation_instructions: Option<String>,
    pub notification_type: NotificationType,
    pub affected_departments: Vec<String>,
    pub approval_status: EcnApprovalStatus,
    pub implementation_status: ImplementationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub approval_resolved_at: Option<DateTime<Utc>>,
    pub implemented_at: Option<DateTime<Utc>>,
}

impl Ecn {
    /// True when implementation may leave `waiting`
    pub fn is_cleared_for_implementation(&self) -> bool {
        self.notification_type == NotificationType::NotificationOnly
            || self.approval_status == EcnApprovalStatus::Approved
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EcrCreateInput {
    pub title: String,
    pub description: Option<String>,
    pub business_justification: Option<String>,
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub approval_type: Option<ApprovalType>,
    pub estimated_cost: Option<i64>,
    pub estimated_hours: Option<i64>,
    #[serde(default)]
    pub affected_products: Vec<String>,
    #[serde(default)]
    pub affected_departments: Vec<String>,
}

impl EcrCreateInput {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Validator::new()
            .required_text("title", &self.title, MAX_TITLE_LENGTH)
            .optional_text("description", self.description.as_deref(), MAX_TEXT_LENGTH)
            .optional_text(
                "businessJustification",
                self.business_justification.as_deref(),
                MAX_TEXT_LENGTH,
            )
            .optional_text("category", self.category.as_deref(), MAX_CATEGORY_LENGTH)
            .non_negative("estimatedCost", self.estimated_cost)
            .non_negative("estimatedHours", self.estimated_hours)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EcrUpdateInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub business_justification: Option<String>,
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub approval_type: Option<ApprovalType>,
    pub estimated_cost: Option<i64>,
    pub estimated_hours: Option<i64>,
    pub affected_products: Option<Vec<String>>,
    pub affected_departments: Option<Vec<String>>,
}

impl EcrUpdateInput {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Validator::new()
            .optional_text("title", self.title.as_deref(), MAX_TITLE_LENGTH)
            .optional_text("description", self.description.as_deref(), MAX_TEXT_LENGTH)
            .optional_text(
                "businessJustification",
                self.business_justification.as_deref(),
                MAX_TEXT_LENGTH,
            )
            .optional_text("category", self.category.as_deref(), MAX_CATEGORY_LENGTH)
            .non_negative("estimatedCost", self.estimated_cost)
            .non_negative("estimatedHours", self.estimated_hours)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EcoCreateInput {
    pub title: String,
    pub description: Option<String>,
    pub technical_details: Option<String>,
    pub parent_eco_id: Option<String>,
    /// Defaults to the creating user
    pub lead_engineer_id: Option<String>,
    #[serde(default)]
    pub assigned_engineers: Vec<String>,
    pub estimated_hours: Option<i64>,
    #[serde(default)]
    pub linked_ecr_ids: Vec<String>,
}

impl EcoCreateInput {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Validator::new()
            .required_text("title", &self.title, MAX_TITLE_LENGTH)
            .optional_text("description", self.description.as_deref(), MAX_TEXT_LENGTH)
            .optional_text(
                "technicalDetails",
                self.technical_details.as_deref(),
                MAX_TEXT_LENGTH,
            )
            .optional_text("leadEngineerId", self.lead_engineer_id.as_deref(), MAX_TITLE_LENGTH)
            .non_negative("estimatedHours", self.estimated_hours)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EcoUpdateInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub technical_details: Option<String>,
    pub lead_engineer_id: Option<String>,
    pub assigned_engineers: Option<Vec<String>>,
    pub estimated_hours: Option<i64>,
    pub actual_hours: Option<i64>,
    pub implementation_notes: Option<String>,
}

impl EcoUpdateInput {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Validator::new()
            .optional_text("title", self.title.as_deref(), MAX_TITLE_LENGTH)
            .optional_text("description", self.description.as_deref(), MAX_TEXT_LENGTH)
            .optional_text(
                "technicalDetails",
                self.technical_details.as_deref(),
                MAX_TEXT_LENGTH,
            )
            .optional_text("leadEngineerId", self.lead_engineer_id.as_deref(), MAX_TITLE_LENGTH)
            .optional_text(
                "implementationNotes",
                self.implementation_notes.as_deref(),
                MAX_TEXT_LENGTH,
            )
            .non_negative("estimatedHours", self.estimated_hours)
            .non_negative("actualHours", self.actual_hours)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EcnCreateInput {
    pub eco_id: String,
    pub title: String,
    pub implementation_instructions: Option<String>,
    pub notification_type: Option<NotificationType>,
    #[serde(default)]
    pub affected_departments: Vec<String>,
}

impl EcnCreateInput {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Validator::new()
            .required_text("ecoId", &self.eco_id, MAX_TITLE_LENGTH)
            .required_text("title", &self.title, MAX_TITLE_LENGTH)
            .optional_text(
                "implementationInstructions",
                self.implementation_instructions.as_deref(),
                MAX_TEXT_LENGTH,
            )
            .finish()
    }
}
