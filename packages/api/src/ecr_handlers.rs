// ABOUTME: HTTP request handlers for engineering change requests
// ABOUTME: Listing, creation, editing, and status transitions

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::info;

use ecflow_core::{pagination::PaginationParams, EntityType};
use ecflow_workflow::{EcrCreateInput, EcrStatus, EcrUpdateInput};

use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::response::{created, ok, ApiJson};
use crate::state::AppState;
use crate::StatusFilter;

pub async fn list_ecrs(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<StatusFilter<EcrStatus>>,
) -> ApiResult<impl IntoResponse> {
    info!(
        "Listing ECRs for org: {} (page: {})",
        user.org_id,
        pagination.page()
    );

    let page = state
        .workflow
        .storage()
        .list_ecrs(&user.org_id, filter.status, &pagination)
        .await?;
    Ok(ok(page))
}

pub async fn get_ecr(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(ecr_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    info!("Getting ECR: {}", ecr_id);

    let ecr = state
        .workflow
        .storage()
        .get_ecr(&user.org_id, &ecr_id)
        .await
        .map_err(|e| ApiError::lookup(e, EntityType::Ecr, &ecr_id))?;
    Ok(ok(ecr))
}

pub async fn create_ecr(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(input): ApiJson<EcrCreateInput>,
) -> ApiResult<impl IntoResponse> {
    info!("Creating ECR '{}' in org: {}", input.title, user.org_id);

    let ecr = state
        .workflow
        .create_ecr(&user.org_id, &user.user_id, input)
        .await?;
    Ok(created(ecr))
}

pub async fn update_ecr(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(ecr_id): Path<String>,
    ApiJson(input): ApiJson<EcrUpdateInput>,
) -> ApiResult<impl IntoResponse> {
    info!("Updating ECR: {}", ecr_id);

    let ecr = state
        .workflow
        .update_ecr(&user.org_id, &ecr_id, &user.user_id, input)
        .await?;
    Ok(ok(ecr))
}

pub async fn submit_ecr(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(ecr_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    info!("Submitting ECR: {}", ecr_id);

    let ecr = state
        .workflow
        .submit_ecr(&user.org_id, &ecr_id, &user.user_id)
        .await?;
    Ok(ok(ecr))
}

#[derive(Debug, Deserialize)]
pub struct EcrTransitionRequest {
    pub status: EcrStatus,
}

pub async fn transition_ecr(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(ecr_id): Path<String>,
    ApiJson(request): ApiJson<EcrTransitionRequest>,
) -> ApiResult<impl IntoResponse> {
    info!("Transitioning ECR {} to {}", ecr_id, request.status);

    let ecr = state
        .workflow
        .transition_ecr(&user.org_id, &ecr_id, request.status, &user.user_id)
        .await?;
    Ok(ok(ecr))
}
