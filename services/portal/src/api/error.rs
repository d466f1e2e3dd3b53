//! API error types and helpers.
//!
//! # Purpose and responsibility
//! Centralizes HTTP error construction so every endpoint answers with the same
//! body shapes: `{error}` plus an optional `message` or `details`.
//!
//! # Key invariants and assumptions
//! - `error` is one of a fixed set of strings tied to the status code.
//! - Internal failures are logged server-side and never leak storage detail.
use crate::api::types::{ErrorResponse, FieldIssue};
use crate::store::StoreError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tessera_authz::AuthzError;

/// Structured API error returned by handlers.
///
/// # Example
/// ```rust
/// use axum::http::StatusCode;
/// use portal::api::error::api_not_found;
///
/// let err = api_not_found();
/// assert_eq!(err.status, StatusCode::NOT_FOUND);
/// assert_eq!(err.body.error, "Not found");
/// ```
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn error(status: StatusCode, error: &str, message: Option<String>) -> ApiError {
    ApiError {
        status,
        body: ErrorResponse {
            error: error.to_string(),
            message,
            details: None,
        },
    }
}

/// 401 for a request with no usable identity.
pub fn api_unauthorized() -> ApiError {
    error(StatusCode::UNAUTHORIZED, "Unauthorized", None)
}

/// 403 for an identity that lacks a role or an object-level right.
pub fn api_forbidden(message: &str) -> ApiError {
    error(StatusCode::FORBIDDEN, "Forbidden", Some(message.to_string()))
}

/// 403 without a message, used where naming the missing right adds nothing.
pub fn api_forbidden_bare() -> ApiError {
    error(StatusCode::FORBIDDEN, "Forbidden", None)
}

/// 404, also used for resources that exist but are hidden from the caller.
pub fn api_not_found() -> ApiError {
    error(StatusCode::NOT_FOUND, "Not found", None)
}

/// 400 carrying field-level issues.
pub fn api_validation(details: Vec<FieldIssue>) -> ApiError {
    ApiError {
        status: StatusCode::BAD_REQUEST,
        body: ErrorResponse {
            error: "Invalid input".to_string(),
            message: None,
            details: Some(details),
        },
    }
}

/// 400 for a single offending field.
pub fn api_invalid_field(field: &str, message: &str) -> ApiError {
    api_validation(vec![FieldIssue::new(field, message)])
}

pub fn api_conflict(message: &str) -> ApiError {
    error(StatusCode::CONFLICT, "Conflict", Some(message.to_string()))
}

/// 500 from a store error. The error is logged with `context`; the response
/// body stays generic.
pub fn api_internal(context: &str, err: &StoreError) -> ApiError {
    tracing::error!(error = ?err, "{context}");
    api_internal_message(context)
}

/// 500 without a store error to log; callers log their own cause.
pub fn api_internal_message(context: &str) -> ApiError {
    tracing::debug!(context, "responding with internal error");
    error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error",
        None,
    )
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::Unauthenticated => api_unauthorized(),
            AuthzError::Forbidden { .. } => api_forbidden(&err.to_string()),
            AuthzError::InvalidRole(_) | AuthzError::InvalidId(_) => {
                api_invalid_field("id", &err.to_string())
            }
        }
    }
}
