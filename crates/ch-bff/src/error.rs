//! BFF Error Types
//!
//! Request-level failures surface immediately with a plain error body.
//! Collaborator and orchestration failures never reach the caller as a 5xx:
//! the route pipeline degrades or falls back instead.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Error, Debug)]
pub enum BffError {
    #[error("Unauthenticated: {message}")]
    Unauthenticated { message: String },

    #[error("No active club membership")]
    NoActiveTenant,

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Route disabled: {route}")]
    FeatureDisabled { route: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl BffError {
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated { message: message.into() }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden { message: message.into() }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest { message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            BffError::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            BffError::NoActiveTenant | BffError::Forbidden { .. } => StatusCode::FORBIDDEN,
            BffError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            BffError::FeatureDisabled { .. } => StatusCode::NOT_IMPLEMENTED,
            BffError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            BffError::Unauthenticated { .. } => "UNAUTHENTICATED",
            BffError::NoActiveTenant => "NO_ACTIVE_TENANT",
            BffError::Forbidden { .. } => "FORBIDDEN",
            BffError::InvalidRequest { .. } => "INVALID_REQUEST",
            BffError::FeatureDisabled { .. } => "FEATURE_DISABLED",
            BffError::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, BffError>;

/// Error response body
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for BffError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.code().to_string(),
            message: self.to_string(),
        };

        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(BffError::unauthenticated("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(BffError::NoActiveTenant.status(), StatusCode::FORBIDDEN);
        assert_eq!(BffError::forbidden("x").status(), StatusCode::FORBIDDEN);
        assert_eq!(BffError::invalid("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            BffError::FeatureDisabled { route: "dashboard".into() }.status(),
            StatusCode::NOT_IMPLEMENTED
        );
        assert_eq!(BffError::internal("x").status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(BffError::internal("x").code(), "INTERNAL_ERROR");
    }
}
