/// Authentication handlers
///
/// Thin transport layer: deserialize, call [`crate::services::AuthService`],
/// serialize. All semantics live in the service.
use axum::extract::State;
use axum::http::{header::USER_AGENT, HeaderMap, StatusCode};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::error::AuthError;
use crate::handlers::authenticate;
use crate::models::user::{
    ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, LogoutRequest, RefreshTokenRequest,
    RegisterRequest, ResetPasswordRequest,
};
use crate::models::AuthResponse;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn client_context(headers: &HeaderMap) -> (Option<String>, Option<String>) {
    let ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string());
    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    (ip, user_agent)
}

pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AuthError> {
    let (ip, user_agent) = client_context(&headers);
    let response = state
        .auth
        .register(&payload.email, &payload.username, &payload.password, ip, user_agent)
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    let (ip, user_agent) = client_context(&headers);
    let response = state
        .auth
        .login(&payload.email, &payload.password, ip, user_agent)
        .await?;
    Ok(Json(response))
}

/// Always answers 200: the caller is logged out regardless of backend
/// cleanup outcome.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<LogoutRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    let claims = authenticate(&state, &headers).await?;
    state.auth.logout(&claims.sid, &payload.refresh_token).await;
    Ok(Json(MessageResponse {
        message: "Logged out successfully".to_string(),
    }))
}

pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    let response = state.auth.refresh(&payload.refresh_token).await?;
    Ok(Json(response))
}

pub async fn change_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<StatusCode, AuthError> {
    let claims = authenticate(&state, &headers).await?;
    let user_id = claims.user_id().ok_or(AuthError::TokenInvalid)?;
    state
        .auth
        .change_password(user_id, &payload.old_password, &payload.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Always answers 202 so the endpoint cannot be used to probe for
/// registered emails.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AuthError> {
    if let Err(e) = state.auth.forgot_password(&payload.email).await {
        tracing::warn!("forgot_password failed internally: {}", e);
    }
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "message": "If the email exists, a reset link has been sent" })),
    ))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<StatusCode, AuthError> {
    state
        .auth
        .reset_password(&payload.token, &payload.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
