//! Authentication and authorization logic.
//!
//! Provides password hashing, JWT management, credential verification,
//! server-side sessions and the OAuth identity bridge.

pub mod credentials;
pub mod jwt;
pub mod oauth;
pub mod password;
pub mod sessions;

use thiserror::Error;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Identity not found")]
    NotFound,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("A user with the given username is already registered: {0}")]
    UserExists(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("OAuth error: {0}")]
    OAuth(String),

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Short machine-readable name, used in JSON error bodies.
    pub fn name(&self) -> &'static str {
        match self {
            AuthError::NotFound => "NotFoundError",
            AuthError::InvalidCredentials => "IncorrectCredentialsError",
            AuthError::InvalidToken(_) => "InvalidTokenError",
            AuthError::MalformedToken(_) => "MalformedTokenError",
            AuthError::UserExists(_) => "UserExistsError",
            AuthError::Forbidden(_) => "ForbiddenError",
            AuthError::ValidationError(_) => "ValidationError",
            AuthError::OAuth(_) => "OAuthError",
            AuthError::DbError(_) => "DatabaseError",
            AuthError::Internal(_) => "InternalError",
        }
    }
}
