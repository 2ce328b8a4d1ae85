// ABOUTME: HTTP request handlers for engineering change notices
// ABOUTME: Issuance, implementation progress, and the ECN approval decision

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::info;

use ecflow_core::{pagination::PaginationParams, EntityType};
use ecflow_workflow::{EcnApprovalDecision, EcnCreateInput, ImplementationStatus};

use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::response::{created, ok, ApiJson};
use crate::state::AppState;
use crate::StatusFilter;

pub async fn list_ecns(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<StatusFilter<ImplementationStatus>>,
) -> ApiResult<impl IntoResponse> {
    info!(
        "Listing ECNs for org: {} (page: {})",
        user.org_id,
        pagination.page()
    );

    let page = state
        .workflow
        .storage()
        .list_ecns(&user.org_id, filter.status, &pagination)
        .await?;
    Ok(ok(page))
}

pub async fn get_ecn(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(ecn_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    info!("Getting ECN: {}", ecn_id);

    let ecn = state
        .workflow
        .storage()
        .get_ecn(&user.org_id, &ecn_id)
        .await
        .map_err(|e| ApiError::lookup(e, EntityType::Ecn, &ecn_id))?;
    Ok(ok(ecn))
}

pub async fn create_ecn(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(input): ApiJson<EcnCreateInput>,
) -> ApiResult<impl IntoResponse> {
    info!("Creating ECN for ECO {} in org: {}", input.eco_id, user.org_id);

    let ecn = state
        .workflow
        .create_ecn(&user.org_id, &user.user_id, input)
        .await?;
    Ok(created(ecn))
}

#[derive(Debug, Deserialize)]
pub struct ImplementationRequest {
    pub status: ImplementationStatus,
}

pub async fn advance_implementation(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(ecn_id): Path<String>,
    ApiJson(request): ApiJson<ImplementationRequest>,
) -> ApiResult<impl IntoResponse> {
    info!("Advancing ECN {} to {}", ecn_id, request.status);

    let ecn = state
        .workflow
        .advance_ecn_implementation(&user.org_id, &ecn_id, request.status, &user.user_id)
        .await?;
    Ok(ok(ecn))
}

#[derive(Debug, Deserialize)]
pub struct EcnApprovalRequest {
    pub decision: EcnApprovalDecision,
}

pub async fn resolve_approval(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(ecn_id): Path<String>,
    ApiJson(request): ApiJson<EcnApprovalRequest>,
) -> ApiResult<impl IntoResponse> {
    info!("Resolving approval of ECN {}: {:?}", ecn_id, request.decision);

    let ecn = state
        .workflow
        .resolve_ecn_approval(&user.org_id, &ecn_id, request.decision, &user.user_id)
        .await?;
    Ok(ok(ecn))
}
