use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{pages::PageStoreError, repository::RepositoryError, response::ApiResponse};

/// FieldError
///
/// One failed validation rule, reported back to the admin form next to the field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// ApiError
///
/// Two tiers: client errors carry their message to the caller, everything else
/// is logged and collapsed to a generic 500.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("validation failed ({} field errors)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Pages(#[from] PageStoreError),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Convenience alias for handler and controller results.
pub type ApiResult<T> = Result<T, ApiError>;

const GENERIC_FAILURE: &str = "An unexpected error occurred";

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Pages(PageStoreError::InvalidName(_)) => StatusCode::BAD_REQUEST,
            ApiError::Pages(PageStoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Repository(_) | ApiError::Pages(_) | ApiError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            ApiError::Validation(errors) => {
                let summary = errors
                    .iter()
                    .map(|e| format!("{}: {}", e.field, e.message))
                    .collect::<Vec<_>>()
                    .join("; ");
                ApiResponse::failure("Validation failed", summary)
                    .with_meta(json!({ "errors": errors }))
            }
            ApiError::BadRequest(msg) => ApiResponse::failure("Bad request", msg.clone()),
            ApiError::NotFound(msg) => ApiResponse::failure("Not found", msg.clone()),
            ApiError::Unauthorized(msg) => ApiResponse::failure("Unauthorized", msg.clone()),
            ApiError::Forbidden(msg) => ApiResponse::failure("Forbidden", msg.clone()),
            ApiError::Pages(PageStoreError::InvalidName(name)) => {
                ApiResponse::failure("Bad request", format!("invalid page name: {name}"))
            }
            ApiError::Pages(PageStoreError::NotFound(name)) => {
                ApiResponse::failure("Not found", format!("page {name} not found"))
            }
            other => {
                // Internals stay in the log, never in the response.
                tracing::error!(error = %other, "request failed with an unexpected error");
                ApiResponse::failure("Internal server error", GENERIC_FAILURE)
            }
        };

        (status, Json(body)).into_response()
    }
}
