//! Application error handling
//!
//! `ApiError` is the only place where failure kinds are mapped to HTTP
//! status codes and envelopes. Handlers and services return it with `?`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chatmentor_shared::{AuthError, Envelope, FieldErrors};
use thiserror::Error;
use tracing::{error, warn};

use crate::repositories::StoreError;

pub const VALIDATION_MESSAGE: &str = "One or more validation errors occurred.";
pub const UNAUTHORIZED_MESSAGE: &str = "You are not authorized to perform this action.";
pub const FORBIDDEN_MESSAGE: &str = "You do not have permission to perform this action.";
pub const INVALID_STATE_MESSAGE: &str = "Operation is not valid in the current state.";
pub const UNIMPLEMENTED_MESSAGE: &str = "This feature is not implemented.";
pub const METHOD_NOT_ALLOWED_MESSAGE: &str = "The requested method is not allowed for this resource.";
pub const TIMEOUT_MESSAGE: &str = "The request took too long to complete.";
pub const INTERNAL_MESSAGE: &str = "An unexpected error occurred. Please try again later.";

/// API error type that can be converted to HTTP responses
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation failed for {} field(s)", .0.len())]
    Validation(FieldErrors),

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Detail is logged, never returned to the caller
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Payload too large")]
    PayloadTooLarge,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Request timed out")]
    Timeout,

    #[error("Not implemented")]
    Unimplemented,

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("Database error")]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    /// Single-field validation failure
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field, message);
        ApiError::Validation(errors)
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::InvalidState(_) | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Timeout => StatusCode::REQUEST_TIMEOUT,
            ApiError::Unimplemented => StatusCode::NOT_IMPLEMENTED,
            ApiError::Internal(_) | ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<FieldErrors> for ApiError {
    fn from(errors: FieldErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Unauthorized(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => {
                ApiError::field("email", "The email address is already registered.")
            }
            StoreError::NotFound(what) => ApiError::NotFound(what),
            StoreError::Database(e) => ApiError::Database(e),
            StoreError::Io(e) => ApiError::Internal(e.into()),
            StoreError::Other(e) => ApiError::Internal(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match self {
            ApiError::Validation(errors) => Envelope::fail(Some(errors), VALIDATION_MESSAGE),
            ApiError::NotFound(msg) | ApiError::BadRequest(msg) => Envelope::fail(None, msg),
            ApiError::Unauthorized(detail) => {
                warn!(%detail, "request rejected as unauthorized");
                Envelope::error(UNAUTHORIZED_MESSAGE)
            }
            ApiError::Forbidden(detail) => {
                warn!(%detail, "request rejected as forbidden");
                Envelope::error(FORBIDDEN_MESSAGE)
            }
            ApiError::InvalidState(detail) => {
                warn!(%detail, "invalid operation state");
                Envelope::error(INVALID_STATE_MESSAGE)
            }
            ApiError::PayloadTooLarge => Envelope::error("Request body is too large."),
            ApiError::MethodNotAllowed => Envelope::fail(None, METHOD_NOT_ALLOWED_MESSAGE),
            ApiError::Timeout => {
                warn!("request timed out");
                Envelope::error(TIMEOUT_MESSAGE)
            }
            ApiError::Unimplemented => Envelope::error(UNIMPLEMENTED_MESSAGE),
            ApiError::Internal(err) => {
                error!("Internal error: {:?}", err);
                Envelope::error(INTERNAL_MESSAGE)
            }
            ApiError::Database(err) => {
                error!("Database error: {:?}", err);
                Envelope::error(INTERNAL_MESSAGE)
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn body_json(error: ApiError) -> (StatusCode, Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_validation_error_is_fail_with_field_map() {
        let mut errors = FieldErrors::new();
        errors.add("email", "Invalid email format.");
        errors.add("confirmPassword", "Passwords do not match.");

        let (status, body) = body_json(ApiError::Validation(errors)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "Fail");
        assert_eq!(body["message"], VALIDATION_MESSAGE);
        assert_eq!(body["data"]["email"][0], "Invalid email format.");
        assert_eq!(body["data"]["confirmPassword"][0], "Passwords do not match.");
    }

    #[tokio::test]
    async fn test_not_found_error_status() {
        let (status, body) = body_json(ApiError::NotFound("User not found.".to_string())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "Fail");
        assert!(body["data"].is_null());
        assert_eq!(body["message"], "User not found.");
    }

    #[tokio::test]
    async fn test_unauthorized_hides_detail() {
        let (status, body) =
            body_json(ApiError::Unauthorized("user 12 not found".to_string())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["status"], "Error");
        assert_eq!(body["message"], UNAUTHORIZED_MESSAGE);
    }

    #[tokio::test]
    async fn test_internal_error_is_generic() {
        let (status, body) =
            body_json(ApiError::Internal(anyhow::anyhow!("disk on fire at /var/x"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], "Error");
        assert_eq!(body["message"], INTERNAL_MESSAGE);
        assert!(!body.to_string().contains("disk on fire"));
    }

    #[tokio::test]
    async fn test_invalid_state_and_unimplemented() {
        let (status, body) = body_json(ApiError::InvalidState("page 0".to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], INVALID_STATE_MESSAGE);

        let (status, body) = body_json(ApiError::Unimplemented).await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
        assert_eq!(body["status"], "Error");
    }

    #[tokio::test]
    async fn test_method_not_allowed_and_timeout() {
        let (status, body) = body_json(ApiError::MethodNotAllowed).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body["status"], "Fail");
        assert_eq!(body["message"], METHOD_NOT_ALLOWED_MESSAGE);

        let (status, body) = body_json(ApiError::Timeout).await;
        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
        assert_eq!(body["status"], "Error");
    }

    #[test]
    fn test_duplicate_email_maps_to_email_field() {
        match ApiError::from(StoreError::DuplicateEmail) {
            ApiError::Validation(errors) => assert!(errors.contains("email")),
            other => panic!("unexpected {other:?}"),
        }
    }
}
