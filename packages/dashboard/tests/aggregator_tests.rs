// ABOUTME: Integration tests for the dashboard aggregator
// ABOUTME: Tests organization scoping, calendar-month boundaries, and activity feed ordering

use chrono::{Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;
use sqlx::SqlitePool;
use std::sync::Arc;

use ecflow_approvals::{ApprovalCoordinator, ApprovalOpenInput};
use ecflow_core::{EntityRef, EntityType};
use ecflow_dashboard::{DashboardAggregator, DashboardMetrics};
use ecflow_notifications::NotificationStorage;
use ecflow_storage::test_utils::memory_pool;
use ecflow_workflow::{AuditAction, EcoCreateInput, EcoUpdateInput, EcrCreateInput, WorkflowEngine};

const ORG: &str = "org-dash";

fn engine(pool: &SqlitePool) -> WorkflowEngine {
    WorkflowEngine::new(pool.clone(), Arc::new(NotificationStorage::new(pool.clone())))
}

fn ecr(title: &str) -> EcrCreateInput {
    EcrCreateInput {
        title: title.to_string(),
        ..Default::default()
    }
}

fn eco(title: &str) -> EcoCreateInput {
    EcoCreateInput {
        title: title.to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_metrics_are_scoped_to_org() {
    let pool = memory_pool().await;
    let engine = engine(&pool);
    let approvals = ApprovalCoordinator::new(
        pool.clone(),
        Arc::new(NotificationStorage::new(pool.clone())),
    );
    let dashboard = DashboardAggregator::new(pool.clone());

    let submitted = engine.create_ecr(ORG, "alice", ecr("Submitted")).await.unwrap();
    engine.submit_ecr(ORG, &submitted.id, "alice").await.unwrap();
    engine.create_ecr(ORG, "alice", ecr("Still a draft")).await.unwrap();

    let running = engine.create_eco(ORG, "mgr", eco("Running")).await.unwrap();
    engine.start_eco(ORG, &running.id, "mgr").await.unwrap();
    engine.create_eco(ORG, "mgr", eco("Backlog")).await.unwrap();

    let done = engine.create_eco(ORG, "mgr", eco("Done")).await.unwrap();
    engine.start_eco(ORG, &done.id, "mgr").await.unwrap();
    engine.send_eco_to_review(ORG, &done.id, "mgr").await.unwrap();
    engine.complete_eco(ORG, &done.id, "mgr").await.unwrap();

    approvals
        .open_approval(
            ORG,
            ApprovalOpenInput::new(EntityRef::new(EntityType::Ecr, &submitted.id), "mgr", 1),
        )
        .await
        .unwrap();

    // Noise in another organization
    let other = engine.create_ecr("org-noise", "zed", ecr("Other")).await.unwrap();
    engine.submit_ecr("org-noise", &other.id, "zed").await.unwrap();
    approvals
        .open_approval(
            "org-noise",
            ApprovalOpenInput::new(EntityRef::new(EntityType::Ecr, &other.id), "mgr", 1),
        )
        .await
        .unwrap();

    let metrics = dashboard.metrics(ORG).await.unwrap();
    assert_eq!(
        metrics,
        DashboardMetrics {
            active_ecrs: 1,
            in_progress_ecos: 1,
            pending_approvals: 1,
            completed_this_month: 1,
        }
    );

    let json = serde_json::to_value(&metrics).unwrap();
    assert_eq!(json["activeECRs"], 1);
    assert_eq!(json["inProgressECOs"], 1);
    assert_eq!(json["pendingApprovals"], 1);
    assert_eq!(json["completedThisMonth"], 1);
}

#[tokio::test]
async fn test_completed_this_month_uses_calendar_boundaries() {
    let pool = memory_pool().await;
    let engine = engine(&pool);
    let dashboard = DashboardAggregator::new(pool.clone());

    let completed = engine.create_eco(ORG, "mgr", eco("Boundary")).await.unwrap();
    engine.start_eco(ORG, &completed.id, "mgr").await.unwrap();
    engine.send_eco_to_review(ORG, &completed.id, "mgr").await.unwrap();
    engine.complete_eco(ORG, &completed.id, "mgr").await.unwrap();

    let now = Utc.with_ymd_and_hms(2025, 6, 15, 9, 30, 0).unwrap();
    let set_completed_at = |at: chrono::DateTime<Utc>| {
        sqlx::query("UPDATE ecos SET completed_at = ? WHERE id = ?")
            .bind(at)
            .bind(completed.id.clone())
            .execute(&pool)
    };

    let last_day_previous_month = Utc.with_ymd_and_hms(2025, 5, 31, 23, 59, 59).unwrap();
    set_completed_at(last_day_previous_month).await.unwrap();
    let metrics = dashboard.metrics_at(ORG, now).await.unwrap();
    assert_eq!(metrics.completed_this_month, 0);

    let first_day_current_month = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
    set_completed_at(first_day_current_month).await.unwrap();
    let metrics = dashboard.metrics_at(ORG, now).await.unwrap();
    assert_eq!(metrics.completed_this_month, 1);

    let first_day_next_month = Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap();
    set_completed_at(first_day_next_month).await.unwrap();
    let metrics = dashboard.metrics_at(ORG, now).await.unwrap();
    assert_eq!(metrics.completed_this_month, 0);
}

#[tokio::test]
async fn test_recent_activity_is_newest_first_and_capped() {
    let pool = memory_pool().await;
    let engine = engine(&pool);
    let dashboard = DashboardAggregator::new(pool.clone());

    let first = engine.create_ecr(ORG, "alice", ecr("First")).await.unwrap();
    engine.submit_ecr(ORG, &first.id, "alice").await.unwrap();
    let order = engine.create_eco(ORG, "mgr", eco("Order")).await.unwrap();
    engine
        .update_eco(
            ORG,
            &order.id,
            "mgr",
            EcoUpdateInput {
                actual_hours: Some(3),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    engine.create_ecr("org-noise", "zed", ecr("Hidden")).await.unwrap();

    let feed = dashboard.recent_activity(ORG, None).await.unwrap();
    assert_eq!(feed.len(), 3);
    assert_eq!(feed[0].subject, EntityRef::new(EntityType::Eco, &order.id));
    assert_eq!(feed[0].action, AuditAction::Created);
    assert_eq!(feed[0].number.as_deref(), Some(order.eco_number.as_str()));
    assert_eq!(feed[1].action, AuditAction::StatusChanged);
    assert_eq!(feed[1].changes["status"]["to"], "submitted");
    assert_eq!(feed[2].title.as_deref(), Some("First"));
    assert!(feed
        .windows(2)
        .all(|pair| pair[0].created_at >= pair[1].created_at));

    let capped = dashboard.recent_activity(ORG, Some(1)).await.unwrap();
    assert_eq!(capped.len(), 1);
    let empty = dashboard.recent_activity(ORG, Some(0)).await.unwrap();
    assert!(empty.is_empty());
    let negative = dashboard.recent_activity(ORG, Some(-4)).await.unwrap();
    assert!(negative.is_empty());
    let oversized = dashboard.recent_activity(ORG, Some(500)).await.unwrap();
    assert_eq!(oversized.len(), 3);
}

#[tokio::test]
async fn test_activity_ties_break_on_entity_id() {
    let pool = memory_pool().await;
    let dashboard = DashboardAggregator::new(pool.clone());
    let at = Utc::now() - Duration::minutes(5);

    for (seq, entity_id) in ["ecr-b", "ecr-a", "ecr-c"].iter().enumerate() {
        sqlx::query(
            "INSERT INTO audit_log (id, org_id, user_id, entity_type, entity_id, action, changes, created_at) VALUES (?, ?, 'u', 'ECR', ?, 'created', '{}', ?)",
        )
        .bind(format!("aud-{}", seq))
        .bind(ORG)
        .bind(entity_id)
        .bind(at)
        .execute(&pool)
        .await
        .unwrap();
    }

    let feed = dashboard.recent_activity(ORG, Some(10)).await.unwrap();
    let ids: Vec<&str> = feed.iter().map(|e| e.subject.entity_id.as_str()).collect();
    assert_eq!(ids, vec!["ecr-c", "ecr-b", "ecr-a"]);
    assert!(feed.iter().all(|e| e.number.is_none()));
}
