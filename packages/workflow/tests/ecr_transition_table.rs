// ABOUTME: Exhaustive ECR transition table
// ABOUTME: Every (from, to) status pair is attempted; only documented edges may succeed

use rstest::rstest;
use std::sync::Arc;

use ecflow_notifications::NotificationStorage;
use ecflow_storage::test_utils::memory_pool;
use ecflow_workflow::{EcrCreateInput, EcrStatus, WorkflowEngine, WorkflowError};

const DOCUMENTED_EDGES: &[(EcrStatus, EcrStatus)] = &[
    (EcrStatus::Draft, EcrStatus::Submitted),
    (EcrStatus::Submitted, EcrStatus::UnderReview),
    (EcrStatus::UnderReview, EcrStatus::Approved),
    (EcrStatus::UnderReview, EcrStatus::Rejected),
    (EcrStatus::UnderReview, EcrStatus::MoreInfoNeeded),
    (EcrStatus::UnderReview, EcrStatus::CrbReview),
    (EcrStatus::MoreInfoNeeded, EcrStatus::Submitted),
    (EcrStatus::CrbReview, EcrStatus::Approved),
    (EcrStatus::CrbReview, EcrStatus::Rejected),
];

/// Path from `draft` that ends in `status`
fn path_to(status: EcrStatus) -> Vec<EcrStatus> {
    use EcrStatus::*;
    match status {
        Draft => vec![],
        Submitted => vec![Submitted],
        UnderReview => vec![Submitted, UnderReview],
        Approved => vec![Submitted, UnderReview, Approved],
        Rejected => vec![Submitted, UnderReview, Rejected],
        MoreInfoNeeded => vec![Submitted, UnderReview, MoreInfoNeeded],
        CrbReview => vec![Submitted, UnderReview, CrbReview],
    }
}

#[rstest]
#[tokio::test]
async fn test_ecr_transition_pairs(
    #[values(
        EcrStatus::Draft,
        EcrStatus::Submitted,
        EcrStatus::UnderReview,
        EcrStatus::Approved,
        EcrStatus::Rejected,
        EcrStatus::MoreInfoNeeded,
        EcrStatus::CrbReview
    )]
    from: EcrStatus,
    #[values(
        EcrStatus::Draft,
        EcrStatus::Submitted,
        EcrStatus::UnderReview,
        EcrStatus::Approved,
        EcrStatus::Rejected,
        EcrStatus::MoreInfoNeeded,
        EcrStatus::CrbReview
    )]
    to: EcrStatus,
) {
    let pool = memory_pool().await;
    let engine = WorkflowEngine::new(pool.clone(), Arc::new(NotificationStorage::new(pool)));

    let ecr = engine
        .create_ecr(
            "org-table",
            "requestor",
            EcrCreateInput {
                title: "Table-driven".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    for step in path_to(from) {
        engine
            .transition_ecr("org-table", &ecr.id, step, "manager")
            .await
            .unwrap();
    }

    let result = engine
        .transition_ecr("org-table", &ecr.id, to, "manager")
        .await;

    if DOCUMENTED_EDGES.contains(&(from, to)) {
        let moved = result.unwrap();
        assert_eq!(moved.status, to);
    } else {
        match result {
            Err(WorkflowError::InvalidTransition { from: f, to: t, .. }) => {
                assert_eq!(f, from.to_string());
                assert_eq!(t, to.to_string());
            }
            other => panic!("expected InvalidTransition for {} -> {}, got {:?}", from, to, other),
        }
        let unchanged = engine.storage().get_ecr("org-table", &ecr.id).await.unwrap();
        assert_eq!(unchanged.status, from);
    }
}
