/// Session management handlers
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;

use crate::error::AuthError;
use crate::handlers::authenticate;
use crate::models::{SecurityEvent, SessionRecord};
use crate::services::security_events::EventQuery;
use crate::AppState;

pub async fn list_sessions(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<SessionRecord>>, AuthError> {
    let claims = authenticate(&state, &headers).await?;
    let user_id = claims.user_id().ok_or(AuthError::TokenInvalid)?;
    let sessions = state.auth.list_sessions(user_id).await?;
    Ok(Json(sessions))
}

pub async fn terminate_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
) -> Result<StatusCode, AuthError> {
    let claims = authenticate(&state, &headers).await?;
    let user_id = claims.user_id().ok_or(AuthError::TokenInvalid)?;
    state
        .auth
        .terminate_session(user_id, &session_id, &claims.sid)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct EventQueryParams {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

pub async fn security_events(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<EventQueryParams>,
) -> Result<Json<Vec<SecurityEvent>>, AuthError> {
    let claims = authenticate(&state, &headers).await?;
    let user_id = claims.user_id().ok_or(AuthError::TokenInvalid)?;
    let events = state
        .auth
        .security_events(
            user_id,
            EventQuery {
                limit: params.limit,
                offset: params.offset,
                ..Default::default()
            },
        )
        .await?;
    Ok(Json(events))
}
