// ABOUTME: Approval coordination for change documents
// ABOUTME: Opens, resolves, and evaluates approval tasks against ECR, ECO and ECN subjects

pub mod coordinator;
pub mod error;
pub mod types;

pub use coordinator::ApprovalCoordinator;
pub use error::ApprovalError;
pub use types::{
    Approval, ApprovalDecision, ApprovalOpenInput, ApprovalResolveInput, ApprovalStatus,
    SubjectApprovals,
};
