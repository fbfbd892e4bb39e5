//! Structured error types for API responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    ValidationError,

    // Auth errors
    Unauthorized,
    PermissionDenied,

    // Not found
    NotFound,

    // Conflict errors
    Conflict,

    // Protocol errors
    MethodNotAllowed,

    // Internal errors
    DatabaseError,
    InternalError,
}

impl ErrorCode {
    /// HTTP status code for this error class. NotFound and PermissionDenied
    /// stay distinct so monitoring can tell intrusion attempts from stale
    /// links.
    pub fn http_status(self) -> StatusCode {
        match self {
            ErrorCode::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::PermissionDenied => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ErrorCode::DatabaseError | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Structured API error.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    // Convenience constructors

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::ValidationError,
            format!("{} is required", field),
        )
        .with_field(field)
    }

    pub fn not_found(what: &str) -> Self {
        Self::new(ErrorCode::NotFound, format!("{} not found", what))
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PermissionDenied, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn method_not_allowed() -> Self {
        Self::new(
            ErrorCode::MethodNotAllowed,
            "This endpoint only accepts POST",
        )
    }

    pub fn database(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::DatabaseError, err.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

// Allow using ? with anyhow errors by converting them. Typed errors raised
// deeper in the db layer travel inside anyhow and are recovered here.
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ApiError>() {
            Ok(api_err) => api_err,
            Err(err) => ApiError::internal(err),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    status: &'static str,
    code: ErrorCode,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'a str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            status: "erro",
            code: self.code,
            message: &self.message,
            field: self.field.as_deref(),
        };
        (self.code.http_status(), Json(&body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_are_distinct_for_not_found_and_forbidden() {
        assert_ne!(
            ErrorCode::NotFound.http_status(),
            ErrorCode::PermissionDenied.http_status()
        );
    }

    #[test]
    fn anyhow_round_trip_preserves_code() {
        let err: anyhow::Error = ApiError::conflict("duplicate").into();
        let back = ApiError::from(err);
        assert_eq!(back.code, ErrorCode::Conflict);
        assert_eq!(back.message, "duplicate");
    }

    #[test]
    fn foreign_anyhow_becomes_internal() {
        let err = anyhow::anyhow!("boom");
        let back = ApiError::from(err);
        assert_eq!(back.code, ErrorCode::InternalError);
    }

    #[test]
    fn error_body_serializes_with_erro_status() {
        let body = ErrorBody {
            status: "erro",
            code: ErrorCode::NotFound,
            message: "Step not found",
            field: None,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"status\":\"erro\""));
        assert!(json.contains("\"NOT_FOUND\""));
        assert!(!json.contains("field"));
    }
}
