// ABOUTME: Error type for approval operations
// ABOUTME: Conflicting approval state is reported distinctly from missing records

use thiserror::Error;

use ecflow_core::{EntityRef, ValidationError};
use ecflow_storage::StorageError;

#[derive(Debug, Error)]
pub enum ApprovalError {
    #[error("Validation failed")]
    Validation(Vec<ValidationError>),

    #[error("Approval {0} not found")]
    NotFound(String),

    #[error("{0} not found")]
    SubjectNotFound(EntityRef),

    #[error("{approver_id} already has a pending level {level} approval on {subject}")]
    DuplicateApproval {
        subject: EntityRef,
        approver_id: String,
        level: i64,
    },

    #[error("Approval {id} is already {status}")]
    AlreadyResolved { id: String, status: String },

    #[error("Approval {id} is assigned to another approver")]
    NotApprover { id: String },

    #[error(transparent)]
    Storage(#[from] StorageError),
}
