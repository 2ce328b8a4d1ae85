// ABOUTME: Engineering change workflow for ECR, ECO and ECN records
// ABOUTME: State graphs, record storage, audit trail, and the transactional workflow engine

pub mod audit;
pub mod engine;
pub mod error;
pub mod storage;
pub mod transitions;
pub mod types;

pub use audit::{AuditAction, AuditEntry};
pub use engine::WorkflowEngine;
pub use error::WorkflowError;
pub use storage::{SubjectSummary, WorkflowStorage};
pub use transitions::StateGraph;
pub use types::{
    ApprovalType, Ecn, EcnApprovalDecision, EcnApprovalStatus, EcnCreateInput, Eco,
    EcoCreateInput, EcoStatus, EcoUpdateInput, Ecr, EcrCreateInput, EcrStatus, EcrUpdateInput,
    ImplementationStatus, NotificationType,
};
