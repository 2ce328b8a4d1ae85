// ABOUTME: End-to-end tests for the HTTP surface
// ABOUTME: Drives the router with oneshot requests against an in-memory database

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

use ecflow_api::{create_router, AppState, ORG_HEADER, USER_HEADER};
use ecflow_organizations::{MemberCreateInput, MemberRole, Organization, OrganizationCreateInput};
use ecflow_storage::test_utils::{file_pool_with_busy_timeout, memory_pool};

const ORG: &str = "org-acme";

async fn setup() -> (Router, AppState) {
    let state = AppState::new(memory_pool().await);
    (create_router(state.clone()), state)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    identity: Option<(&str, &str)>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((user, org)) = identity {
        builder = builder.header(USER_HEADER, user).header(ORG_HEADER, org);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn create_ecr(app: &Router, user: &str, org: &str, body: Value) -> Value {
    let (status, json) = send(app, "POST", "/api/ecr", Some((user, org)), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{}", json);
    json["data"].clone()
}

#[tokio::test]
async fn test_health_needs_no_identity() {
    let (app, _) = setup().await;

    let (status, json) = send(&app, "GET", "/api/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let (app, _) = setup().await;

    let (status, json) = send(&app, "GET", "/api/ecr", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], "UNAUTHORIZED");
    assert!(json["request_id"].as_str().is_some());
}

#[tokio::test]
async fn test_create_ecr_allocates_number_and_starts_in_draft() {
    let (app, _) = setup().await;

    let ecr = create_ecr(&app, "alice", ORG, json!({ "title": "Replace bracket" })).await;

    assert!(ecr["ecrNumber"].as_str().unwrap().starts_with("ECR-"));
    assert!(ecr["ecrNumber"].as_str().unwrap().ends_with("-001"));
    assert_eq!(ecr["status"], "draft");
    assert_eq!(ecr["requestorId"], "alice");
    assert_eq!(ecr["priority"], "medium");
}

#[tokio::test]
async fn test_validation_errors_are_listed() {
    let (app, _) = setup().await;

    let (status, json) = send(
        &app,
        "POST",
        "/api/ecr",
        Some(("alice", ORG)),
        Some(json!({ "title": "   ", "estimatedCost": -5 })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
    let fields: Vec<&str> = json["error"]["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"title"));
    assert!(fields.contains(&"estimatedCost"));
}

fn detail_fields(json: &Value) -> Vec<&str> {
    json["error"]["details"]
        .as_array()
        .map(|details| {
            details
                .iter()
                .filter_map(|d| d["field"].as_str())
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn test_missing_required_field_is_listed() {
    let (app, _) = setup().await;

    let (status, json) = send(&app, "POST", "/api/ecr", Some(("alice", ORG)), Some(json!({}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(detail_fields(&json), vec!["title"]);
    assert_eq!(json["error"]["details"][0]["message"], "is required");

    let (status, json) = send(
        &app,
        "POST",
        "/api/ecn",
        Some(("alice", ORG)),
        Some(json!({ "title": "x" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(detail_fields(&json), vec!["ecoId"]);
}

#[tokio::test]
async fn test_unknown_enum_value_names_the_field() {
    let (app, _) = setup().await;

    let (status, json) = send(
        &app,
        "POST",
        "/api/ecr",
        Some(("alice", ORG)),
        Some(json!({ "title": "Bracket", "priority": "urgent-ish" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(detail_fields(&json), vec!["priority"]);
    let message = json["error"]["details"][0]["message"].as_str().unwrap();
    assert!(message.starts_with("unknown variant `urgent-ish`"), "{}", message);
    assert!(!message.contains("line"), "{}", message);
}

#[tokio::test]
async fn test_unparseable_json_is_bad_request() {
    let (app, _) = setup().await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/ecr")
        .header(USER_HEADER, "alice")
        .header(ORG_HEADER, ORG)
        .header("content-type", "application/json")
        .body(Body::from("{\"title\": "))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
    assert!(json["error"].get("details").is_none());
}

#[tokio::test]
async fn test_locked_numbering_is_service_unavailable() {
    let (pool, _dir) = file_pool_with_busy_timeout(std::time::Duration::from_millis(50)).await;
    let app = create_router(AppState::new(pool.clone()));

    let mut blocker = pool.acquire().await.unwrap();
    sqlx::query("BEGIN IMMEDIATE")
        .execute(&mut *blocker)
        .await
        .unwrap();

    let (status, json) = send(
        &app,
        "POST",
        "/api/ecr",
        Some(("alice", ORG)),
        Some(json!({ "title": "Blocked" })),
    )
    .await;

    sqlx::query("ROLLBACK").execute(&mut *blocker).await.unwrap();
    drop(blocker);

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"]["code"], "ALLOCATION_CONFLICT");

    let ecr = create_ecr(&app, "alice", ORG, json!({ "title": "Unblocked" })).await;
    assert!(ecr["ecrNumber"].as_str().unwrap().ends_with("-001"));
}

#[tokio::test]
async fn test_double_submit_is_a_conflict() {
    let (app, _) = setup().await;
    let ecr = create_ecr(&app, "alice", ORG, json!({ "title": "Shim change" })).await;
    let uri = format!("/api/ecr/{}/submit", ecr["id"].as_str().unwrap());

    let (status, json) = send(&app, "POST", &uri, Some(("alice", ORG)), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "submitted");
    assert!(json["data"]["submittedAt"].is_string());

    let (status, json) = send(&app, "POST", &uri, Some(("alice", ORG)), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["code"], "INVALID_TRANSITION");
}

#[tokio::test]
async fn test_other_organizations_cannot_see_records() {
    let (app, _) = setup().await;
    let ecr = create_ecr(&app, "alice", ORG, json!({ "title": "Private" })).await;
    let uri = format!("/api/ecr/{}", ecr["id"].as_str().unwrap());

    let (status, _) = send(&app, "GET", &uri, Some(("alice", ORG)), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(&app, "GET", &uri, Some(("eve", "org-other")), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_list_filters_by_status_and_paginates() {
    let (app, _) = setup().await;
    for title in ["One", "Two", "Three"] {
        create_ecr(&app, "alice", ORG, json!({ "title": title })).await;
    }
    let submitted = create_ecr(&app, "alice", ORG, json!({ "title": "Four" })).await;
    send(
        &app,
        "POST",
        &format!("/api/ecr/{}/submit", submitted["id"].as_str().unwrap()),
        Some(("alice", ORG)),
        None,
    )
    .await;

    let (status, json) = send(
        &app,
        "GET",
        "/api/ecr?status=submitted",
        Some(("alice", ORG)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["data"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"]["data"][0]["title"], "Four");

    let (_, json) = send(
        &app,
        "GET",
        "/api/ecr?page=2&limit=3",
        Some(("alice", ORG)),
        None,
    )
    .await;
    assert_eq!(json["data"]["data"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"]["pagination"]["totalItems"], 4);
    assert_eq!(json["data"]["pagination"]["totalPages"], 2);
}

/// Organization with `admin-1` and `mgr-1` on the review board and `eng-1` as engineer
async fn board_org(state: &AppState) -> Organization {
    let org = state
        .organizations
        .create_organization(OrganizationCreateInput {
            name: "Acme Manufacturing".to_string(),
            subdomain: "acme".to_string(),
            plan_type: None,
            settings: None,
        })
        .await
        .unwrap();
    for (user, role) in [
        ("admin-1", MemberRole::Admin),
        ("mgr-1", MemberRole::EngineeringManager),
        ("eng-1", MemberRole::Engineer),
    ] {
        state
            .organizations
            .add_member(
                &org.id,
                MemberCreateInput {
                    user_id: user.to_string(),
                    role: Some(role),
                    department: None,
                },
            )
            .await
            .unwrap();
    }
    org
}

#[tokio::test]
async fn test_failed_board_fan_out_keeps_ecr_submitted() {
    let (app, state) = setup().await;
    let org = board_org(&state).await;

    let ecr = create_ecr(
        &app,
        "eng-1",
        &org.id,
        json!({ "title": "Switch alloy", "approvalType": "change_review_board" }),
    )
    .await;
    let ecr_id = ecr["id"].as_str().unwrap().to_string();
    send(
        &app,
        "POST",
        &format!("/api/ecr/{}/submit", ecr_id),
        Some(("eng-1", &org.id)),
        None,
    )
    .await;

    sqlx::query(
        "CREATE TRIGGER reject_mgr_approval BEFORE INSERT ON approvals WHEN NEW.approver_id = 'mgr-1' BEGIN SELECT RAISE(ABORT, 'approval store unavailable'); END",
    )
    .execute(&state.pool)
    .await
    .unwrap();

    let transition = format!("/api/ecr/{}/transition", ecr_id);
    let (status, json) = send(
        &app,
        "POST",
        &transition,
        Some(("mgr-1", &org.id)),
        Some(json!({ "status": "under_review" })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"]["code"], "INTERNAL_ERROR");

    let (_, json) = send(
        &app,
        "GET",
        &format!("/api/ecr/{}", ecr_id),
        Some(("eng-1", &org.id)),
        None,
    )
    .await;
    assert_eq!(json["data"]["status"], "submitted");
    let approvals_uri = format!("/api/approvals/ECR/{}", ecr_id);
    let (_, json) = send(&app, "GET", &approvals_uri, Some(("eng-1", &org.id)), None).await;
    assert_eq!(json["data"]["approvals"], json!([]));

    sqlx::query("DROP TRIGGER reject_mgr_approval")
        .execute(&state.pool)
        .await
        .unwrap();

    let (status, json) = send(
        &app,
        "POST",
        &transition,
        Some(("mgr-1", &org.id)),
        Some(json!({ "status": "under_review" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "under_review");
    let (_, json) = send(&app, "GET", &approvals_uri, Some(("eng-1", &org.id)), None).await;
    assert_eq!(json["data"]["approvals"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_change_review_board_flow() {
    let (app, state) = setup().await;
    let org = board_org(&state).await;

    let ecr = create_ecr(
        &app,
        "eng-1",
        &org.id,
        json!({ "title": "Switch alloy", "approvalType": "change_review_board" }),
    )
    .await;
    let ecr_id = ecr["id"].as_str().unwrap().to_string();
    let transition = format!("/api/ecr/{}/transition", ecr_id);

    send(
        &app,
        "POST",
        &format!("/api/ecr/{}/submit", ecr_id),
        Some(("eng-1", &org.id)),
        None,
    )
    .await;
    let (status, _) = send(
        &app,
        "POST",
        &transition,
        Some(("mgr-1", &org.id)),
        Some(json!({ "status": "under_review" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let approvals_uri = format!("/api/approvals/ECR/{}", ecr_id);
    let (status, json) = send(&app, "GET", &approvals_uri, Some(("eng-1", &org.id)), None).await;
    assert_eq!(status, StatusCode::OK);
    let approvals = json["data"]["approvals"].as_array().unwrap().clone();
    assert_eq!(approvals.len(), 2);
    assert_eq!(json["data"]["satisfied"], false);

    let (_, pending) = send(
        &app,
        "GET",
        "/api/dashboard/pending-approvals",
        Some(("mgr-1", &org.id)),
        None,
    )
    .await;
    assert_eq!(pending["data"].as_array().unwrap().len(), 1);

    for approval in &approvals {
        let approver = approval["approverId"].as_str().unwrap();
        let uri = format!("/api/approvals/{}", approval["id"].as_str().unwrap());

        let (status, json) = send(
            &app,
            "PUT",
            &uri,
            Some(("eng-1", &org.id)),
            Some(json!({ "decision": "approved" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["error"]["code"], "NOT_APPROVER");

        let (status, json) = send(
            &app,
            "PUT",
            &uri,
            Some((approver, &org.id)),
            Some(json!({ "decision": "approved", "comments": "Looks good" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["status"], "approved");
    }

    let (_, json) = send(&app, "GET", &approvals_uri, Some(("eng-1", &org.id)), None).await;
    assert_eq!(json["data"]["satisfied"], true);

    let (status, json) = send(
        &app,
        "POST",
        &transition,
        Some(("mgr-1", &org.id)),
        Some(json!({ "status": "approved" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "approved");
}

#[tokio::test]
async fn test_board_ecr_cannot_be_approved_without_approvals() {
    let (app, _) = setup().await;
    let ecr = create_ecr(
        &app,
        "alice",
        ORG,
        json!({ "title": "No board", "approvalType": "change_review_board" }),
    )
    .await;
    let id = ecr["id"].as_str().unwrap();

    send(&app, "POST", &format!("/api/ecr/{}/submit", id), Some(("alice", ORG)), None).await;
    send(
        &app,
        "POST",
        &format!("/api/ecr/{}/transition", id),
        Some(("bob", ORG)),
        Some(json!({ "status": "under_review" })),
    )
    .await;

    let (status, json) = send(
        &app,
        "POST",
        &format!("/api/ecr/{}/transition", id),
        Some(("bob", ORG)),
        Some(json!({ "status": "approved" })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["code"], "APPROVAL_REQUIRED");
}

#[tokio::test]
async fn test_eco_lifecycle_and_review_required_ecn() {
    let (app, _) = setup().await;
    let me = Some(("lead", ORG));

    let (status, json) = send(
        &app,
        "POST",
        "/api/eco",
        me,
        Some(json!({ "title": "Rework housing" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let eco_id = json["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(json["data"]["status"], "backlog");
    assert_eq!(json["data"]["leadEngineerId"], "lead");

    let (status, json) = send(&app, "POST", &format!("/api/eco/{}/complete", eco_id), me, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["code"], "INVALID_TRANSITION");

    for action in ["start", "review", "complete"] {
        let (status, _) = send(&app, "POST", &format!("/api/eco/{}/{}", eco_id, action), me, None).await;
        assert_eq!(status, StatusCode::OK, "{}", action);
    }

    let (status, json) = send(
        &app,
        "POST",
        "/api/ecn",
        me,
        Some(json!({
            "ecoId": eco_id,
            "title": "Housing rework notice",
            "notificationType": "review_required"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let ecn_id = json["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(json["data"]["approvalStatus"], "pending");
    assert_eq!(json["data"]["implementationStatus"], "waiting");

    let implementation = format!("/api/ecn/{}/implementation", ecn_id);
    let (status, json) = send(
        &app,
        "POST",
        &implementation,
        me,
        Some(json!({ "status": "in_progress" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["code"], "APPROVAL_REQUIRED");

    let (status, json) = send(
        &app,
        "POST",
        &format!("/api/ecn/{}/approval", ecn_id),
        Some(("qa", ORG)),
        Some(json!({ "decision": "approved" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["approvalStatus"], "approved");

    let (status, json) = send(
        &app,
        "POST",
        &implementation,
        me,
        Some(json!({ "status": "in_progress" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["implementationStatus"], "in_progress");

    let (_, json) = send(&app, "GET", &format!("/api/eco/{}/ecns", eco_id), me, None).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    let (_, json) = send(&app, "GET", "/api/ecn?status=in_progress", me, None).await;
    assert_eq!(json["data"]["pagination"]["totalItems"], 1);
}

#[tokio::test]
async fn test_ecn_for_unknown_eco_is_not_found() {
    let (app, _) = setup().await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/ecn",
        Some(("lead", ORG)),
        Some(json!({ "ecoId": "eco-missing", "title": "Orphan" })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_comments_attach_to_existing_subjects() {
    let (app, _) = setup().await;
    let ecr = create_ecr(&app, "alice", ORG, json!({ "title": "Commented" })).await;
    let id = ecr["id"].as_str().unwrap();

    let (status, json) = send(
        &app,
        "POST",
        "/api/comments",
        Some(("bob", ORG)),
        Some(json!({ "entityType": "ECR", "entityId": id, "commentText": "Need drawings" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["commentText"], "Need drawings");
    assert_eq!(json["data"]["userId"], "bob");

    let (status, json) = send(
        &app,
        "GET",
        &format!("/api/comments/ecr/{}", id),
        Some(("alice", ORG)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    let (status, _) = send(
        &app,
        "POST",
        "/api/comments",
        Some(("bob", ORG)),
        Some(json!({ "entityType": "ECR", "entityId": "ecr-nope", "commentText": "Hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/comments/ECX/{}", id),
        Some(("alice", ORG)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_requestor_is_notified_of_status_changes() {
    let (app, _) = setup().await;
    let ecr = create_ecr(&app, "alice", ORG, json!({ "title": "Notify me" })).await;
    let id = ecr["id"].as_str().unwrap();

    send(&app, "POST", &format!("/api/ecr/{}/submit", id), Some(("alice", ORG)), None).await;
    send(
        &app,
        "POST",
        &format!("/api/ecr/{}/transition", id),
        Some(("bob", ORG)),
        Some(json!({ "status": "under_review" })),
    )
    .await;

    let (status, json) = send(&app, "GET", "/api/notifications", Some(("alice", ORG)), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["unreadCount"], 1);
    let notification_id = json["data"]["notifications"][0]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let uri = format!("/api/notifications/{}/read", notification_id);
    let (status, _) = send(&app, "PUT", &uri, Some(("bob", ORG)), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = send(&app, "PUT", &uri, Some(("alice", ORG)), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["isRead"], true);
}

#[tokio::test]
async fn test_dashboard_reflects_organization_state() {
    let (app, _) = setup().await;
    let ecr = create_ecr(&app, "alice", ORG, json!({ "title": "Counted" })).await;
    create_ecr(&app, "alice", "org-other", json!({ "title": "Not counted" })).await;
    send(
        &app,
        "POST",
        &format!("/api/ecr/{}/submit", ecr["id"].as_str().unwrap()),
        Some(("alice", ORG)),
        None,
    )
    .await;

    let (status, json) = send(&app, "GET", "/api/dashboard/metrics", Some(("alice", ORG)), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json["data"],
        json!({
            "activeECRs": 1,
            "inProgressECOs": 0,
            "pendingApprovals": 0,
            "completedThisMonth": 0
        })
    );

    let (_, json) = send(
        &app,
        "GET",
        "/api/dashboard/activity?limit=1",
        Some(("alice", ORG)),
        None,
    )
    .await;
    let activity = json["data"].as_array().unwrap();
    assert_eq!(activity.len(), 1);
    assert_eq!(activity[0]["action"], "status_changed");

    let (status, json) = send(
        &app,
        "GET",
        "/api/dashboard/activity?limit=0",
        Some(("alice", ORG)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"], json!([]));

    let (_, json) = send(&app, "GET", "/api/dashboard/activity", Some(("alice", ORG)), None).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);
}
