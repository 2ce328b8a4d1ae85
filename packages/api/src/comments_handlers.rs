// ABOUTME: HTTP request handlers for comment threads
// ABOUTME: Comments attach to ECRs, ECOs and ECNs within the caller's organization

use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::info;

use ecflow_comments::CommentCreateInput;
use ecflow_workflow::WorkflowError;

use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::parse_subject;
use crate::response::{created, ok, ApiJson};
use crate::state::AppState;

pub async fn create_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(input): ApiJson<CommentCreateInput>,
) -> ApiResult<impl IntoResponse> {
    let subject = input.subject();
    info!("Adding comment to {} by {}", subject, user.user_id);

    input.validate().map_err(WorkflowError::Validation)?;

    let comment = state
        .comments
        .create_comment(&user.org_id, &user.user_id, input)
        .await
        .map_err(|e| ApiError::lookup(e, subject.entity_type, &subject.entity_id))?;
    Ok(created(comment))
}

pub async fn list_comments(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((entity_type, entity_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let subject = parse_subject(&entity_type, entity_id)?;
    info!("Listing comments for {}", subject);

    state
        .workflow
        .storage()
        .subject_summary(&user.org_id, &subject)
        .await
        .map_err(|e| ApiError::lookup(e, subject.entity_type, &subject.entity_id))?;

    let comments = state
        .comments
        .list_for_subject(&user.org_id, &subject)
        .await?;
    Ok(ok(comments))
}
