// ABOUTME: Unified API error type and its HTTP mapping
// ABOUTME: Converts workflow, approval, and storage failures into status codes with structured bodies

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::error::Error as StdError;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use ecflow_approvals::ApprovalError;
use ecflow_core::{EntityType, ValidationError};
use ecflow_storage::StorageError;
use ecflow_workflow::WorkflowError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing or invalid identity headers")]
    Unauthorized,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Request body failed validation")]
    InvalidBody(Vec<ValidationError>),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Approval(#[from] ApprovalError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Body of every error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
    pub request_id: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationError>>,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// Turn a storage `NotFound` for a looked-up document into a typed 404
    pub fn lookup(err: StorageError, entity: EntityType, id: &str) -> Self {
        match err {
            StorageError::NotFound => WorkflowError::not_found(entity, id).into(),
            other => ApiError::Storage(other),
        }
    }

    pub fn to_status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::InvalidBody(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),

            ApiError::Workflow(err) => match err {
                WorkflowError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
                WorkflowError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                WorkflowError::InvalidTransition { .. } => {
                    (StatusCode::CONFLICT, "INVALID_TRANSITION")
                }
                WorkflowError::ApprovalRequired { .. } => {
                    (StatusCode::CONFLICT, "APPROVAL_REQUIRED")
                }
                WorkflowError::NotEditable { .. } => (StatusCode::CONFLICT, "NOT_EDITABLE"),
                WorkflowError::AllocationConflict(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "ALLOCATION_CONFLICT")
                }
                WorkflowError::Storage(storage) => storage_status(storage),
            },

            ApiError::Approval(err) => match err {
                ApprovalError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
                ApprovalError::NotFound(_) | ApprovalError::SubjectNotFound(_) => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND")
                }
                ApprovalError::DuplicateApproval { .. } => {
                    (StatusCode::CONFLICT, "DUPLICATE_APPROVAL")
                }
                ApprovalError::AlreadyResolved { .. } => (StatusCode::CONFLICT, "ALREADY_RESOLVED"),
                ApprovalError::NotApprover { .. } => (StatusCode::FORBIDDEN, "NOT_APPROVER"),
                ApprovalError::Storage(storage) => storage_status(storage),
            },

            ApiError::Storage(storage) => storage_status(storage),
        }
    }

    /// Message shown to the caller. Internal failures never leak their cause.
    pub fn to_user_message(&self) -> String {
        let (status, _) = self.to_status_and_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            return "An internal error occurred".to_string();
        }
        match self {
            ApiError::Storage(StorageError::NotFound) => "Resource not found".to_string(),
            other => other.to_string(),
        }
    }

    fn validation_details(&self) -> Option<Vec<ValidationError>> {
        match self {
            ApiError::Workflow(WorkflowError::Validation(errors))
            | ApiError::Approval(ApprovalError::Validation(errors))
            | ApiError::InvalidBody(errors) => Some(errors.clone()),
            _ => None,
        }
    }
}

fn storage_status(err: &StorageError) -> (StatusCode, &'static str) {
    match err {
        StorageError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    }
}

type JsonPathError = serde_path_to_error::Error<serde_json::Error>;

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if let JsonRejection::JsonDataError(data_error) = &rejection {
            let path_error = data_error
                .source()
                .and_then(|inner| inner.source())
                .and_then(|inner| inner.downcast_ref::<JsonPathError>());
            if let Some(path_error) = path_error {
                return ApiError::InvalidBody(vec![field_error(path_error)]);
            }
        }
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Name the offending field of a body that parsed as JSON but not as the target type
fn field_error(err: &JsonPathError) -> ValidationError {
    let path = err.path().to_string();
    let path = match path.as_str() {
        "." | "?" => None,
        _ => Some(path),
    };

    // serde_json appends the position, which means nothing to API callers
    let message = err.inner().to_string();
    let message = match message.find(" at line ") {
        Some(pos) => message[..pos].to_string(),
        None => message,
    };

    if let Some(missing) = missing_field_name(&message) {
        let field = match path {
            Some(parent) => format!("{}.{}", parent, missing),
            None => missing.to_string(),
        };
        return ValidationError::new(field, "is required");
    }

    ValidationError::new(path.unwrap_or_else(|| "body".to_string()), message)
}

fn missing_field_name(message: &str) -> Option<&str> {
    message
        .strip_prefix("missing field `")
        .and_then(|rest| rest.strip_suffix('`'))
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let request_id = Uuid::new_v4().to_string();
        let (status_code, error_code) = self.to_status_and_code();

        if status_code.is_server_error() {
            error!(
                request_id = %request_id,
                error_code = %error_code,
                error = %self,
                "Request failed"
            );
        } else {
            info!(
                request_id = %request_id,
                error_code = %error_code,
                error = %self,
                "API error response"
            );
        }

        let body = ErrorResponse {
            success: false,
            error: ErrorDetail {
                code: error_code.to_string(),
                message: self.to_user_message(),
                details: self.validation_details(),
            },
            request_id,
        };

        (status_code, Json(body)).into_response()
    }
}
