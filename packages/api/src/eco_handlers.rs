// ABOUTME: HTTP request handlers for engineering change orders
// ABOUTME: Listing, creation, editing, and the named lifecycle actions

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use tracing::info;

use ecflow_core::{pagination::PaginationParams, EntityType};
use ecflow_workflow::{EcoCreateInput, EcoStatus, EcoUpdateInput};

use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::response::{created, ok, ApiJson};
use crate::state::AppState;
use crate::StatusFilter;

pub async fn list_ecos(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<StatusFilter<EcoStatus>>,
) -> ApiResult<impl IntoResponse> {
    info!(
        "Listing ECOs for org: {} (page: {})",
        user.org_id,
        pagination.page()
    );

    let page = state
        .workflow
        .storage()
        .list_ecos(&user.org_id, filter.status, &pagination)
        .await?;
    Ok(ok(page))
}

pub async fn get_eco(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(eco_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    info!("Getting ECO: {}", eco_id);

    let eco = state
        .workflow
        .storage()
        .get_eco(&user.org_id, &eco_id)
        .await
        .map_err(|e| ApiError::lookup(e, EntityType::Eco, &eco_id))?;
    Ok(ok(eco))
}

/// ECNs issued for one ECO, oldest first
pub async fn list_eco_ecns(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(eco_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let storage = state.workflow.storage();
    storage
        .get_eco(&user.org_id, &eco_id)
        .await
        .map_err(|e| ApiError::lookup(e, EntityType::Eco, &eco_id))?;

    let ecns = storage.list_ecns_for_eco(&user.org_id, &eco_id).await?;
    Ok(ok(ecns))
}

pub async fn create_eco(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(input): ApiJson<EcoCreateInput>,
) -> ApiResult<impl IntoResponse> {
    info!("Creating ECO '{}' in org: {}", input.title, user.org_id);

    let eco = state
        .workflow
        .create_eco(&user.org_id, &user.user_id, input)
        .await?;
    Ok(created(eco))
}

pub async fn update_eco(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(eco_id): Path<String>,
    ApiJson(input): ApiJson<EcoUpdateInput>,
) -> ApiResult<impl IntoResponse> {
    info!("Updating ECO: {}", eco_id);

    let eco = state
        .workflow
        .update_eco(&user.org_id, &eco_id, &user.user_id, input)
        .await?;
    Ok(ok(eco))
}

pub async fn start_eco(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(eco_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    info!("Starting ECO: {}", eco_id);
    let eco = state
        .workflow
        .start_eco(&user.org_id, &eco_id, &user.user_id)
        .await?;
    Ok(ok(eco))
}

pub async fn review_eco(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(eco_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    info!("Sending ECO to review: {}", eco_id);
    let eco = state
        .workflow
        .send_eco_to_review(&user.org_id, &eco_id, &user.user_id)
        .await?;
    Ok(ok(eco))
}

pub async fn complete_eco(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(eco_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    info!("Completing ECO: {}", eco_id);
    let eco = state
        .workflow
        .complete_eco(&user.org_id, &eco_id, &user.user_id)
        .await?;
    Ok(ok(eco))
}

pub async fn hold_eco(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(eco_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    info!("Putting ECO on hold: {}", eco_id);
    let eco = state
        .workflow
        .hold_eco(&user.org_id, &eco_id, &user.user_id)
        .await?;
    Ok(ok(eco))
}

pub async fn resume_eco(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(eco_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    info!("Resuming ECO: {}", eco_id);
    let eco = state
        .workflow
        .resume_eco(&user.org_id, &eco_id, &user.user_id)
        .await?;
    Ok(ok(eco))
}
