pub mod auth;
pub mod session;

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;

use crate::error::{AuthError, Result};
use crate::models::{Claims, TokenType};
use crate::AppState;

pub use auth::{
    change_password, forgot_password, login, logout, refresh_token, register, reset_password,
};
pub use session::{list_sessions, security_events, terminate_session};

/// Resolve the caller from the `Authorization: Bearer` header. Handlers for
/// protected routes call this first; everything else is transport plumbing.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Claims> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AuthError::TokenInvalid)?;

    state.auth.tokens().validate(token, TokenType::Access).await
}
