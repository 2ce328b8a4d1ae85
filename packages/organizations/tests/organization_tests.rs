// ABOUTME: Integration tests for organization storage
// ABOUTME: Tests tenant creation, membership uniqueness, and review board selection

use ecflow_organizations::{
    MemberCreateInput, MemberRole, OrganizationCreateInput, OrganizationSettings,
    OrganizationStorage, PlanType,
};
use ecflow_storage::test_utils::memory_pool;
use ecflow_storage::StorageError;

fn acme() -> OrganizationCreateInput {
    OrganizationCreateInput {
        name: "Acme Manufacturing".to_string(),
        subdomain: "Acme".to_string(),
        plan_type: Some(PlanType::Professional),
        settings: Some(OrganizationSettings {
            enable_change_review_board: true,
            approval_levels: vec!["manager".to_string(), "board".to_string()],
        }),
    }
}

fn member(user_id: &str, role: MemberRole) -> MemberCreateInput {
    MemberCreateInput {
        user_id: user_id.to_string(),
        role: Some(role),
        department: Some("Engineering".to_string()),
    }
}

#[tokio::test]
async fn test_create_and_fetch_organization() {
    let storage = OrganizationStorage::new(memory_pool().await);

    let org = storage.create_organization(acme()).await.unwrap();
    assert!(org.id.starts_with("org-"));
    assert_eq!(org.id.len(), "org-".len() + 21);
    assert_eq!(org.subdomain, "acme");
    assert_eq!(org.plan_type, PlanType::Professional);
    assert!(org.settings.enable_change_review_board);
    assert_eq!(org.settings.approval_levels, vec!["manager", "board"]);

    let by_subdomain = storage.get_by_subdomain("ACME").await.unwrap();
    assert_eq!(by_subdomain.id, org.id);

    let err = storage.get_organization("org-missing").await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn test_duplicate_subdomain_is_rejected() {
    let storage = OrganizationStorage::new(memory_pool().await);
    storage.create_organization(acme()).await.unwrap();

    let err = storage.create_organization(acme()).await.unwrap_err();
    assert!(err.is_unique_violation());
}

#[tokio::test]
async fn test_update_settings() {
    let storage = OrganizationStorage::new(memory_pool().await);
    let org = storage.create_organization(acme()).await.unwrap();

    let updated = storage
        .update_settings(&org.id, OrganizationSettings::default())
        .await
        .unwrap();
    assert!(!updated.settings.enable_change_review_board);
    assert!(updated.settings.approval_levels.is_empty());
}

#[tokio::test]
async fn test_one_membership_per_user() {
    let storage = OrganizationStorage::new(memory_pool().await);
    let org = storage.create_organization(acme()).await.unwrap();

    let alice = storage
        .add_member(&org.id, member("alice", MemberRole::Engineer))
        .await
        .unwrap();
    assert!(alice.id.starts_with("mem-"));
    assert_eq!(alice.id.len(), "mem-".len() + 21);
    assert_eq!(alice.role, MemberRole::Engineer);
    assert!(alice.is_active);

    let err = storage
        .add_member(&org.id, member("alice", MemberRole::Admin))
        .await
        .unwrap_err();
    assert!(err.is_unique_violation());
}

#[tokio::test]
async fn test_review_board_contains_active_managers_only() {
    let storage = OrganizationStorage::new(memory_pool().await);
    let org = storage.create_organization(acme()).await.unwrap();

    for (user, role) in [
        ("ada", MemberRole::Admin),
        ("ben", MemberRole::EngineeringManager),
        ("cy", MemberRole::Engineer),
        ("dee", MemberRole::Requestor),
        ("eve", MemberRole::EngineeringManager),
    ] {
        storage.add_member(&org.id, member(user, role)).await.unwrap();
    }
    storage.set_member_active(&org.id, "eve", false).await.unwrap();

    let board = storage.review_board(&org.id).await.unwrap();
    assert_eq!(board, vec!["ada".to_string(), "ben".to_string()]);

    let members = storage.list_members(&org.id).await.unwrap();
    assert_eq!(members.len(), 5);
    assert!(MemberRole::Admin.is_board_member());
    assert!(!MemberRole::Viewer.is_board_member());
}
