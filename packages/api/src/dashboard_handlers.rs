// ABOUTME: HTTP request handlers for the dashboard
// ABOUTME: Metrics, the activity feed, and the caller's pending approvals

use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::info;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::response::ok;
use crate::state::AppState;

pub async fn metrics(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<impl IntoResponse> {
    info!("Computing dashboard metrics for org: {}", user.org_id);

    let metrics = state.dashboard.metrics(&user.org_id).await?;
    Ok(ok(metrics))
}

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<i64>,
}

pub async fn recent_activity(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ActivityQuery>,
) -> ApiResult<impl IntoResponse> {
    let limit = query.limit.unwrap_or(state.activity_limit);
    info!("Fetching {} activity entries for org: {}", limit, user.org_id);

    let activity = state
        .dashboard
        .recent_activity(&user.org_id, Some(limit))
        .await?;
    Ok(ok(activity))
}

pub async fn pending_approvals(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<impl IntoResponse> {
    info!("Fetching pending approvals for user: {}", user.user_id);

    let pending = state
        .approvals
        .pending_for(&user.user_id, &user.org_id)
        .await?;
    Ok(ok(pending))
}
