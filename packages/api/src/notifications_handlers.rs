// ABOUTME: HTTP request handlers for in-app notifications
// ABOUTME: Callers only ever see and mark their own notifications

use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Serialize;
use tracing::info;

use ecflow_notifications::Notification;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::response::ok;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationList {
    pub notifications: Vec<Notification>,
    pub unread_count: i64,
}

pub async fn list_notifications(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<impl IntoResponse> {
    info!("Listing notifications for user: {}", user.user_id);

    let notifications = state
        .notifications
        .list_for_user(&user.user_id, &user.org_id)
        .await?;
    let unread_count = state
        .notifications
        .unread_count(&user.user_id, &user.org_id)
        .await?;

    Ok(ok(NotificationList {
        notifications,
        unread_count,
    }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(notification_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    info!("Marking notification read: {}", notification_id);

    let notification = state
        .notifications
        .mark_read(&notification_id, &user.user_id, &user.org_id)
        .await?;
    Ok(ok(notification))
}
