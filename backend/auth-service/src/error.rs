use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account locked until {locked_until}")]
    AccountLocked { locked_until: DateTime<Utc> },

    #[error("Account inactive")]
    AccountInactive,

    #[error("Invalid token")]
    TokenInvalid,

    #[error("Token expired")]
    TokenExpired,

    #[error("Token revoked")]
    TokenRevoked,

    #[error("Wrong token type")]
    TokenWrongType,

    #[error("Session not found")]
    SessionNotFound,

    #[error("Email already exists")]
    AlreadyExists,

    #[error("Password does not meet strength requirements")]
    WeakPassword,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AuthError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "Invalid email or password".to_string(),
            ),
            AuthError::AccountLocked { locked_until } => (
                StatusCode::FORBIDDEN,
                format!("Account locked until {}", locked_until.to_rfc3339()),
            ),
            AuthError::AccountInactive => {
                (StatusCode::FORBIDDEN, "Account is inactive".to_string())
            }
            AuthError::TokenInvalid => (StatusCode::UNAUTHORIZED, "Invalid token".to_string()),
            AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "Token expired".to_string()),
            AuthError::TokenRevoked => (StatusCode::UNAUTHORIZED, "Token revoked".to_string()),
            AuthError::TokenWrongType => {
                (StatusCode::UNAUTHORIZED, "Wrong token type".to_string())
            }
            AuthError::SessionNotFound => {
                (StatusCode::NOT_FOUND, "Session not found".to_string())
            }
            AuthError::AlreadyExists => {
                (StatusCode::CONFLICT, "Email already registered".to_string())
            }
            AuthError::WeakPassword => (
                StatusCode::BAD_REQUEST,
                "Password does not meet strength requirements".to_string(),
            ),
            AuthError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            // Infrastructure failures never leak details to the caller.
            AuthError::Store(_) | AuthError::Database(_) | AuthError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        AuthError::Database(err.to_string())
    }
}

impl From<kv_store::StoreError> for AuthError {
    fn from(err: kv_store::StoreError) -> Self {
        AuthError::Store(err.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        AuthError::Internal(format!("serialization failed: {}", err))
    }
}
