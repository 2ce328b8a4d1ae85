// ABOUTME: Shared domain types for change management
// ABOUTME: Entity kinds, polymorphic subject references, and priorities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The three kinds of change document tracked by the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "UPPERCASE")]
pub enum EntityType {
    #[serde(rename = "ECR", alias = "ecr")]
    Ecr,
    #[serde(rename = "ECO", alias = "eco")]
    Eco,
    #[serde(rename = "ECN", alias = "ecn")]
    Ecn,
}

impl EntityType {
    pub const ALL: [EntityType; 3] = [EntityType::Ecr, EntityType::Eco, EntityType::Ecn];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Ecr => "ECR",
            EntityType::Eco => "ECO",
            EntityType::Ecn => "ECN",
        }
    }

    /// Prefix used for the opaque row id (not the human-readable number)
    pub fn id_prefix(&self) -> &'static str {
        match self {
            EntityType::Ecr => "ecr",
            EntityType::Eco => "eco",
            EntityType::Ecn => "ecn",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown entity type: {0}")]
pub struct ParseEntityTypeError(pub String);

impl FromStr for EntityType {
    type Err = ParseEntityTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ECR" => Ok(EntityType::Ecr),
            "ECO" => Ok(EntityType::Eco),
            "ECN" => Ok(EntityType::Ecn),
            _ => Err(ParseEntityTypeError(s.to_string())),
        }
    }
}

/// Polymorphic reference to an ECR, ECO or ECN.
///
/// The three target tables are disjoint, so integrity is checked by
/// dispatching on `entity_type` rather than by a foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    #[serde(rename = "entityType")]
    pub entity_type: EntityType,
    #[serde(rename = "entityId")]
    pub entity_id: String,
}

impl EntityRef {
    pub fn new(entity_type: EntityType, entity_id: impl Into<String>) -> Self {
        Self {
            entity_type,
            entity_id: entity_id.into(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.entity_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}
