// ABOUTME: HTTP API layer for Ecflow providing REST endpoints and routing
// ABOUTME: Integration layer that depends on all domain packages

use axum::{
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;

use ecflow_core::{EntityRef, EntityType};

pub mod approvals_handlers;
pub mod auth;
pub mod comments_handlers;
pub mod dashboard_handlers;
pub mod ecn_handlers;
pub mod eco_handlers;
pub mod ecr_handlers;
pub mod error;
pub mod health;
pub mod notifications_handlers;
pub mod response;
pub mod state;

pub use auth::{CurrentUser, ORG_HEADER, USER_HEADER};
pub use error::{ApiError, ApiResult};
pub use response::ApiResponse;
pub use state::AppState;

/// Optional `?status=` filter on list endpoints
#[derive(Debug, Deserialize)]
pub struct StatusFilter<S> {
    pub status: Option<S>,
}

/// Build a subject reference from `/{entity_type}/{entity_id}` path segments
pub(crate) fn parse_subject(entity_type: &str, entity_id: String) -> Result<EntityRef, ApiError> {
    let entity_type = entity_type
        .parse::<EntityType>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(EntityRef::new(entity_type, entity_id))
}

/// Creates the ECR API router
pub fn create_ecr_router() -> Router<AppState> {
    Router::new()
        .route("/", get(ecr_handlers::list_ecrs).post(ecr_handlers::create_ecr))
        .route("/{id}", get(ecr_handlers::get_ecr).put(ecr_handlers::update_ecr))
        .route("/{id}/submit", post(ecr_handlers::submit_ecr))
        .route("/{id}/transition", post(ecr_handlers::transition_ecr))
}

/// Creates the ECO API router
pub fn create_eco_router() -> Router<AppState> {
    Router::new()
        .route("/", get(eco_handlers::list_ecos).post(eco_handlers::create_eco))
        .route("/{id}", get(eco_handlers::get_eco).put(eco_handlers::update_eco))
        .route("/{id}/ecns", get(eco_handlers::list_eco_ecns))
        .route("/{id}/start", post(eco_handlers::start_eco))
        .route("/{id}/review", post(eco_handlers::review_eco))
        .route("/{id}/complete", post(eco_handlers::complete_eco))
        .route("/{id}/hold", post(eco_handlers::hold_eco))
        .route("/{id}/resume", post(eco_handlers::resume_eco))
}

/// Creates the ECN API router
pub fn create_ecn_router() -> Router<AppState> {
    Router::new()
        .route("/", get(ecn_handlers::list_ecns).post(ecn_handlers::create_ecn))
        .route("/{id}", get(ecn_handlers::get_ecn))
        .route(
            "/{id}/implementation",
            post(ecn_handlers::advance_implementation),
        )
        .route("/{id}/approval", post(ecn_handlers::resolve_approval))
}

/// Creates the approvals API router
pub fn create_approvals_router() -> Router<AppState> {
    Router::new()
        .route("/", post(approvals_handlers::open_approval))
        .route("/{id}", put(approvals_handlers::resolve_approval))
        .route(
            "/{entity_type}/{entity_id}",
            get(approvals_handlers::subject_approvals),
        )
}

/// Creates the comments API router
pub fn create_comments_router() -> Router<AppState> {
    Router::new()
        .route("/", post(comments_handlers::create_comment))
        .route(
            "/{entity_type}/{entity_id}",
            get(comments_handlers::list_comments),
        )
}

/// Creates the notifications API router
pub fn create_notifications_router() -> Router<AppState> {
    Router::new()
        .route("/", get(notifications_handlers::list_notifications))
        .route("/{id}/read", put(notifications_handlers::mark_read))
}

/// Creates the dashboard API router
pub fn create_dashboard_router() -> Router<AppState> {
    Router::new()
        .route("/metrics", get(dashboard_handlers::metrics))
        .route("/activity", get(dashboard_handlers::recent_activity))
        .route(
            "/pending-approvals",
            get(dashboard_handlers::pending_approvals),
        )
}

/// The complete `/api` surface bound to its state
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health::health_check))
        .nest("/dashboard", create_dashboard_router())
        .nest("/ecr", create_ecr_router())
        .nest("/eco", create_eco_router())
        .nest("/ecn", create_ecn_router())
        .nest("/approvals", create_approvals_router())
        .nest("/comments", create_comments_router())
        .nest("/notifications", create_notifications_router());

    Router::new().nest("/api", api).with_state(state)
}
