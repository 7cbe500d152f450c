use thiserror::Error;

use crate::auth::TokenError;
use crate::filter::FilterError;

/// Failures reported by a [`Backend`](super::Backend).
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("User already registered")]
    AlreadyRegistered,

    #[error("Session not found or expired")]
    SessionNotFound,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid row: {0}")]
    InvalidRow(String),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Row decode failed: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

impl From<argon2::password_hash::Error> for BackendError {
    fn from(err: argon2::password_hash::Error) -> Self {
        BackendError::PasswordHash(err.to_string())
    }
}
