//! Application error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use apiseed_core::auth::AuthError;
use apiseed_core::store::StoreError;
use thiserror::Error;
use tracing::error;

use crate::models::{ErrorBody, ErrorResponse};

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    /// No credential was presented.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// A token or session was presented but did not verify.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Login failed.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Registration error: {message}")]
    Registration { name: String, message: String },

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    fn parts(&self) -> (StatusCode, &str, &str) {
        match self {
            AppError::Unauthenticated(m) => (StatusCode::FORBIDDEN, "UnauthenticatedError", m.as_str()),
            AppError::InvalidToken(m) => (StatusCode::FORBIDDEN, "InvalidTokenError", m.as_str()),
            AppError::Forbidden(m) => (StatusCode::FORBIDDEN, "ForbiddenError", m.as_str()),
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "AuthenticationError", m.as_str()),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, "NotFoundError", m.as_str()),
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, "ValidationError", m.as_str()),
            AppError::Registration { name, message } => {
                (StatusCode::INTERNAL_SERVER_ERROR, name.as_str(), message.as_str())
            }
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalError",
                "Internal server error",
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal(detail) = &self {
            error!(detail = %detail, "internal error");
        }
        let (status, name, message) = self.parts();
        let body = Json(ErrorResponse {
            success: false,
            err: ErrorBody {
                name: name.to_string(),
                message: message.to_string(),
            },
        });
        (status, body).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::NotFound => AppError::NotFound("User not found".into()),
            AuthError::InvalidCredentials => {
                AppError::Unauthorized("Password or username are incorrect".into())
            }
            AuthError::InvalidToken(msg) | AuthError::MalformedToken(msg) => {
                AppError::InvalidToken(format!("You are not authenticated! {msg}"))
            }
            e @ AuthError::UserExists(_) => AppError::Registration {
                name: e.name().to_string(),
                message: e.to_string(),
            },
            AuthError::Forbidden(msg) => AppError::Forbidden(msg),
            AuthError::ValidationError(msg) => AppError::Validation(msg),
            AuthError::OAuth(msg) => AppError::Unauthorized(msg),
            AuthError::DbError(e) => AppError::Internal(e.to_string()),
            AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Validation(msg) => AppError::Validation(msg),
            StoreError::Db(e) => AppError::Internal(e.to_string()),
        }
    }
}
