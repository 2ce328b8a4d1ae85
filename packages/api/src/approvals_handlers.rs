// ABOUTME: HTTP request handlers for approval tasks
// ABOUTME: Opening and resolving approvals and reading a subject's approval state

use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::info;

use ecflow_approvals::{ApprovalOpenInput, ApprovalResolveInput};

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::response::{created, ok, ApiJson};
use crate::state::AppState;
use crate::parse_subject;

pub async fn open_approval(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(input): ApiJson<ApprovalOpenInput>,
) -> ApiResult<impl IntoResponse> {
    info!(
        "Opening approval on {} for {} (requested by {})",
        input.subject(),
        input.approver_id,
        user.user_id
    );

    let approval = state.approvals.open_approval(&user.org_id, input).await?;
    Ok(created(approval))
}

pub async fn resolve_approval(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(approval_id): Path<String>,
    ApiJson(input): ApiJson<ApprovalResolveInput>,
) -> ApiResult<impl IntoResponse> {
    info!("Resolving approval {} as {:?}", approval_id, input.decision);

    let approval = state
        .approvals
        .resolve(&user.org_id, &approval_id, &user.user_id, input)
        .await?;
    Ok(ok(approval))
}

pub async fn subject_approvals(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((entity_type, entity_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let subject = parse_subject(&entity_type, entity_id)?;
    info!("Getting approvals for {}", subject);

    let approvals = state
        .approvals
        .subject_approvals(&user.org_id, &subject)
        .await?;
    Ok(ok(approvals))
}
