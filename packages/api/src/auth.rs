// ABOUTME: Caller identity for API requests
// ABOUTME: Reads the user and organization supplied by the authenticating proxy

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;

pub const USER_HEADER: &str = "x-user-id";
pub const ORG_HEADER: &str = "x-org-id";

/// Verified caller. Both ids are required; the organization is never defaulted.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: String,
    pub org_id: String,
}

fn header_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header_value(parts, USER_HEADER).ok_or(ApiError::Unauthorized)?;
        let org_id = header_value(parts, ORG_HEADER).ok_or(ApiError::Unauthorized)?;
        Ok(Self { user_id, org_id })
    }
}
