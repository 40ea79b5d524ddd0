//! Error types for foodgram.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // === Client Errors ===
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Recipe not found: {0}")]
    RecipeNotFound(String),

    #[error("Already added: {0}")]
    AlreadyExists(String),

    #[error("Already subscribed to this author")]
    AlreadySubscribed,

    #[error("Cannot subscribe to yourself")]
    SelfSubscription,

    #[error("Not subscribed to this author")]
    NotSubscribed,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    // === Server Errors ===
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            // 4xx Client Errors
            Self::NotFound(_)
            | Self::UserNotFound(_)
            | Self::RecipeNotFound(_)
            | Self::NotSubscribed => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) | Self::Validation(_) | Self::SelfSubscription => {
                StatusCode::BAD_REQUEST
            }
            Self::AlreadyExists(_) | Self::AlreadySubscribed => StatusCode::CONFLICT,

            // 5xx Server Errors
            Self::Database(_) | Self::Config(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::RecipeNotFound(_) => "RECIPE_NOT_FOUND",
            Self::AlreadyExists(_) => "ALREADY_EXISTS",
            Self::AlreadySubscribed => "ALREADY_SUBSCRIBED",
            Self::SelfSubscription => "SELF_SUBSCRIPTION",
            Self::NotSubscribed => "NOT_SUBSCRIBED",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns whether this error should be logged at error level.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        if self.is_server_error() {
            tracing::error!(error = %self, code = code, "Server error occurred");
        } else {
            tracing::debug!(error = %self, code = code, "Client error occurred");
        }

        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

// === From implementations ===

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_errors_are_client_errors() {
        let already = AppError::AlreadyExists("Recipe is already in the shopping cart".into());
        assert_eq!(already.status_code(), StatusCode::CONFLICT);
        assert!(!already.is_server_error());

        assert_eq!(
            AppError::NotFound("favorite".into()).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_subscription_errors() {
        assert_eq!(
            AppError::SelfSubscription.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::AlreadySubscribed.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(AppError::NotSubscribed.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::SelfSubscription.error_code(), "SELF_SUBSCRIPTION");
    }

    #[test]
    fn test_database_error_is_server_error() {
        let err = AppError::Database("connection reset".into());
        assert!(err.is_server_error());
        assert_eq!(err.error_code(), "DATABASE_ERROR");
    }
}
