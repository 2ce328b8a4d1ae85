// ABOUTME: Tenant organizations and their members
// ABOUTME: Supplies member roles and the change review board used for CRB approvals

pub mod storage;
pub mod types;

pub use storage::OrganizationStorage;
pub use types::{
    MemberCreateInput, MemberRole, Organization, OrganizationCreateInput, OrganizationMember,
    OrganizationSettings, PlanType,
};
