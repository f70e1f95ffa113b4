//! Platform Error Types

use thiserror::Error;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response, Json},
};
use reuse_common::NullNotAllowed;
use tracing::error;
use utoipa::ToSchema;

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Already exists: {entity_type} with {field}={value}")]
    AlreadyExists { entity_type: String, field: String, value: String },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {message}")]
    InvalidToken { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl PlatformError {
    pub fn not_found(entity_type: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    pub fn already_exists(entity_type: impl Into<String>, field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity_type: entity_type.into(),
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict { message: message.into() }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument { message: message.into() }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized { message: message.into() }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden { message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Machine-readable code used in response bodies and bulk reports.
    pub fn code(&self) -> &'static str {
        match self {
            PlatformError::NotFound { .. } => "NOT_FOUND",
            PlatformError::Conflict { .. } => "CONFLICT",
            PlatformError::AlreadyExists { .. } => "ALREADY_EXISTS",
            PlatformError::InvalidArgument { .. } => "INVALID_ARGUMENT",
            PlatformError::Unauthorized { .. } => "UNAUTHORIZED",
            PlatformError::Forbidden { .. } => "FORBIDDEN",
            PlatformError::InvalidCredentials => "INVALID_CREDENTIALS",
            PlatformError::TokenExpired => "TOKEN_EXPIRED",
            PlatformError::InvalidToken { .. } => "INVALID_TOKEN",
            PlatformError::Database(_) | PlatformError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            PlatformError::NotFound { .. } => StatusCode::NOT_FOUND,
            PlatformError::Conflict { .. } | PlatformError::AlreadyExists { .. } => StatusCode::CONFLICT,
            PlatformError::InvalidArgument { .. } => StatusCode::BAD_REQUEST,
            PlatformError::Unauthorized { .. }
            | PlatformError::InvalidCredentials
            | PlatformError::TokenExpired
            | PlatformError::InvalidToken { .. } => StatusCode::UNAUTHORIZED,
            PlatformError::Forbidden { .. } => StatusCode::FORBIDDEN,
            PlatformError::Database(_) | PlatformError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Store or runtime failure, as opposed to a rejected input.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, PlatformError::Database(_) | PlatformError::Internal { .. })
    }
}

impl From<NullNotAllowed> for PlatformError {
    fn from(err: NullNotAllowed) -> Self {
        PlatformError::invalid_argument(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PlatformError>;

/// Error response body
#[derive(Debug, serde::Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for PlatformError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = if self.is_infrastructure() {
            error!(error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error: self.code().to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(PlatformError::not_found("Item", 7).status(), StatusCode::NOT_FOUND);
        assert_eq!(PlatformError::conflict("claimed").status(), StatusCode::CONFLICT);
        assert_eq!(
            PlatformError::already_exists("User", "email", "a@b.com").status(),
            StatusCode::CONFLICT
        );
        assert_eq!(PlatformError::invalid_argument("bad").status(), StatusCode::BAD_REQUEST);
        assert_eq!(PlatformError::TokenExpired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(PlatformError::forbidden("no").status(), StatusCode::FORBIDDEN);
        assert_eq!(PlatformError::internal("boom").status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_token_errors_stay_distinct() {
        let expired = PlatformError::TokenExpired;
        let invalid = PlatformError::InvalidToken { message: "bad signature".into() };
        assert_ne!(expired.code(), invalid.code());
        assert_eq!(expired.status(), invalid.status());
    }

    #[test]
    fn test_null_not_allowed_maps_to_invalid_argument() {
        let err: PlatformError = NullNotAllowed { field: "title" }.into();
        assert!(matches!(err, PlatformError::InvalidArgument { .. }));
        assert!(err.to_string().contains("title"));
    }
}
