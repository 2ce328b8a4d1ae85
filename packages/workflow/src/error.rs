// ABOUTME: Error type for workflow operations
// ABOUTME: Separates contract violations from storage failures so callers can map them

use thiserror::Error;

use ecflow_core::{EntityType, ValidationError};
use ecflow_numbering::AllocationError;
use ecflow_storage::StorageError;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Validation failed: {}", summarize(.0))]
    Validation(Vec<ValidationError>),

    #[error("{entity} {id} not found")]
    NotFound { entity: EntityType, id: String },

    #[error("Invalid {entity} transition from {from} to {to}")]
    InvalidTransition {
        entity: EntityType,
        from: String,
        to: String,
    },

    #[error("{entity} {id} has no approval on record")]
    ApprovalRequired { entity: EntityType, id: String },

    #[error("{entity} {id} cannot be edited while {status}")]
    NotEditable {
        entity: EntityType,
        id: String,
        status: String,
    },

    #[error("Could not allocate a number: {0}")]
    AllocationConflict(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl WorkflowError {
    pub fn not_found(entity: EntityType, id: impl Into<String>) -> Self {
        WorkflowError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn invalid_transition(
        entity: EntityType,
        from: impl ToString,
        to: impl ToString,
    ) -> Self {
        WorkflowError::InvalidTransition {
            entity,
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

impl From<sqlx::Error> for WorkflowError {
    fn from(err: sqlx::Error) -> Self {
        WorkflowError::Storage(StorageError::Sqlx(err))
    }
}

impl From<AllocationError> for WorkflowError {
    fn from(err: AllocationError) -> Self {
        match err {
            AllocationError::Conflict { .. } => WorkflowError::AllocationConflict(err.to_string()),
            AllocationError::Storage(e) => WorkflowError::Storage(e),
        }
    }
}

fn summarize(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
