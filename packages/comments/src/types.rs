// ABOUTME: Comment type definitions
// ABOUTME: A comment belongs to one ECR, ECO or ECN subject

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ecflow_core::{EntityRef, EntityType, ValidationError, Validator};

const MAX_COMMENT_LENGTH: usize = 10_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    #[serde(rename = "orgId")]
    pub org_id: String,
    #[serde(flatten)]
    pub subject: EntityRef,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "commentText")]
    pub text: String,
    #[serde(rename = "isInternal")]
    pub is_internal: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "editedAt")]
    pub edited_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentCreateInput {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub comment_text: String,
    #[serde(default)]
    pub is_internal: bool,
}

impl CommentCreateInput {
    pub fn subject(&self) -> EntityRef {
        EntityRef::new(self.entity_type, self.entity_id.clone())
    }

    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Validator::new()
            .required_text("entityId", &self.entity_id, 255)
            .required_text("commentText", &self.comment_text, MAX_COMMENT_LENGTH)
            .finish()
    }
}
