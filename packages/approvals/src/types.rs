// ABOUTME: Approval type definitions
// ABOUTME: Approval records, decisions, and the inputs for opening and resolving them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use ecflow_core::{EntityRef, EntityType, ValidationError, Validator};

const MAX_NOTE_LENGTH: usize = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    Conditional,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
            ApprovalStatus::Conditional => "conditional",
        }
    }

    /// Approved and rejected records never change again
    pub fn is_final(&self) -> bool {
        matches!(self, ApprovalStatus::Approved | ApprovalStatus::Rejected)
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalDecision {
    Approved,
    Rejected,
    Conditional,
}

impl From<ApprovalDecision> for ApprovalStatus {
    fn from(decision: ApprovalDecision) -> Self {
        match decision {
            ApprovalDecision::Approved => ApprovalStatus::Approved,
            ApprovalDecision::Rejected => ApprovalStatus::Rejected,
            ApprovalDecision::Conditional => ApprovalStatus::Conditional,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Approval {
    pub id: String,
    #[serde(rename = "orgId")]
    pub org_id: String,
    #[serde(flatten)]
    pub subject: EntityRef,
    #[serde(rename = "approverId")]
    pub approver_id: String,
    #[serde(rename = "approvalLevel")]
    pub approval_level: i64,
    pub status: ApprovalStatus,
    pub comments: Option<String>,
    pub conditions: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "resolvedAt")]
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalOpenInput {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub approver_id: String,
    #[serde(default = "default_level")]
    pub approval_level: i64,
}

fn default_level() -> i64 {
    1
}

impl ApprovalOpenInput {
    pub fn new(subject: EntityRef, approver_id: impl Into<String>, approval_level: i64) -> Self {
        Self {
            entity_type: subject.entity_type,
            entity_id: subject.entity_id,
            approver_id: approver_id.into(),
            approval_level,
        }
    }

    pub fn subject(&self) -> EntityRef {
        EntityRef::new(self.entity_type, self.entity_id.clone())
    }

    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Validator::new()
            .required_text("entityId", &self.entity_id, 255)
            .required_text("approverId", &self.approver_id, 255)
            .check(self.approval_level >= 1, "approvalLevel", "must be at least 1")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalResolveInput {
    pub decision: ApprovalDecision,
    pub comments: Option<String>,
    pub conditions: Option<String>,
}

impl ApprovalResolveInput {
    pub fn new(decision: ApprovalDecision) -> Self {
        Self {
            decision,
            comments: None,
            conditions: None,
        }
    }

    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Validator::new()
            .optional_text("comments", self.comments.as_deref(), MAX_NOTE_LENGTH)
            .optional_text("conditions", self.conditions.as_deref(), MAX_NOTE_LENGTH)
            .check(
                self.decision != ApprovalDecision::Conditional || self.conditions.is_some(),
                "conditions",
                "is required for a conditional approval",
            )
            .finish()
    }
}

/// Approvals of one subject together with whether they clear it
#[derive(Debug, Clone, Serialize)]
pub struct SubjectApprovals {
    pub approvals: Vec<Approval>,
    pub satisfied: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approval_serializes_flat_subject() {
        let approval = Approval {
            id: "apr-1".to_string(),
            org_id: "org-1".to_string(),
            subject: EntityRef::new(EntityType::Ecr, "ecr-1"),
            approver_id: "mgr".to_string(),
            approval_level: 2,
            status: ApprovalStatus::Pending,
            comments: None,
            conditions: None,
            created_at: Utc::now(),
            resolved_at: None,
        };

        let json = serde_json::to_value(&approval).unwrap();
        assert_eq!(json["entityType"], "ECR");
        assert_eq!(json["entityId"], "ecr-1");
        assert_eq!(json["approvalLevel"], 2);
    }

    #[test]
    fn test_open_input_defaults_to_first_level() {
        let input: ApprovalOpenInput =
            serde_json::from_str(r#"{"entityType":"eco","entityId":"eco-1","approverId":"mgr"}"#)
                .unwrap();
        assert_eq!(input.approval_level, 1);
        assert_eq!(input.subject(), EntityRef::new(EntityType::Eco, "eco-1"));
    }

    #[test]
    fn test_conditional_needs_conditions() {
        let input = ApprovalResolveInput::new(ApprovalDecision::Conditional);
        assert!(input.validate().is_err());

        let input = ApprovalResolveInput {
            conditions: Some("Retest after tooling change".to_string()),
            ..input
        };
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_final_statuses() {
        assert!(ApprovalStatus::Approved.is_final());
        assert!(ApprovalStatus::Rejected.is_final());
        assert!(!ApprovalStatus::Conditional.is_final());
        assert!(!ApprovalStatus::Pending.is_final());
    }
}
