/// Login/logout/refresh/register orchestration
///
/// Collaborators arrive as interface-typed constructor arguments; the
/// composition root in `main.rs` wires the concrete implementations.
/// Security-event recording and outbound publication are best-effort side
/// effects here: their failures are logged and never fail the primary
/// operation.
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::db::UserRepository;
use crate::error::{AuthError, Result};
use crate::models::token::PURPOSE_PASSWORD_RESET;
use crate::models::{
    AuthResponse, SecurityEventType, SessionRecord, TokenType, User,
};
use crate::security::{LockoutPolicy, LockoutTransition, PasswordHasher};
use crate::services::events::{AuthEvent, EventPublisher};
use crate::services::security_events::{EventQuery, SecurityEventRecorder};
use crate::services::{SessionStore, TokenService};

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<TokenService>,
    sessions: SessionStore,
    lockout: LockoutPolicy,
    recorder: SecurityEventRecorder,
    publisher: EventPublisher,
    password_reset_ttl_secs: i64,
}

impl AuthService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<TokenService>,
        sessions: SessionStore,
        lockout: LockoutPolicy,
        recorder: SecurityEventRecorder,
        publisher: EventPublisher,
        password_reset_ttl_secs: i64,
    ) -> Self {
        Self {
            users,
            hasher,
            tokens,
            sessions,
            lockout,
            recorder,
            publisher,
            password_reset_ttl_secs,
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub async fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Result<AuthResponse> {
        if email.is_empty() || username.is_empty() {
            return Err(AuthError::Validation(
                "email and username are required".to_string(),
            ));
        }

        let password_hash = self.hasher.hash(password)?;
        let user = self.users.create(email, username, &password_hash).await?;

        let response = self.open_session(&user, ip_address, user_agent).await?;

        self.record(
            Some(user.id),
            SecurityEventType::Registration,
            json!({ "email": email }),
        )
        .await;
        self.publisher.publish(AuthEvent::UserRegistered {
            user_id: user.id,
            email: email.to_string(),
            created_at: user.created_at,
        });

        tracing::info!("User registered: {}", email);
        Ok(response)
    }

    pub async fn login(
        &self,
        email: &str,
        password: &str,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Result<AuthResponse> {
        let Some(mut user) = self.users.find_by_email(email).await? else {
            self.record(
                None,
                SecurityEventType::LoginFailure,
                json!({ "email": email, "reason": "unknown_email" }),
            )
            .await;
            return Err(AuthError::InvalidCredentials);
        };

        if !user.is_active {
            self.record(
                Some(user.id),
                SecurityEventType::LoginFailure,
                json!({ "reason": "inactive" }),
            )
            .await;
            return Err(AuthError::AccountInactive);
        }

        // Lockout is checked before the password comparison so a locked
        // account never leaks whether the password was correct.
        let now = Utc::now();
        if self.lockout.is_locked(&user.security, now) {
            self.record(
                Some(user.id),
                SecurityEventType::LoginFailure,
                json!({ "reason": "locked" }),
            )
            .await;
            return Err(AuthError::AccountLocked {
                locked_until: user.security.locked_until.unwrap_or(now),
            });
        }

        if self.hasher.verify(password, &user.password_hash).is_err() {
            let transition = self.lockout.handle_failed_login(&mut user.security, now);
            // The updated counter must be persisted before control returns.
            self.users.save(&user).await?;

            return match transition {
                LockoutTransition::BecameLocked { until } => {
                    self.record(
                        Some(user.id),
                        SecurityEventType::AccountLocked,
                        json!({ "locked_until": until }),
                    )
                    .await;
                    self.publisher.publish(AuthEvent::AccountLocked {
                        user_id: user.id,
                        locked_until: until,
                    });
                    tracing::warn!("Account locked after repeated failures: {}", user.id);
                    Err(AuthError::AccountLocked { locked_until: until })
                }
                LockoutTransition::StillUnlocked { attempts } => {
                    self.record(
                        Some(user.id),
                        SecurityEventType::LoginFailure,
                        json!({ "reason": "bad_password", "attempts": attempts }),
                    )
                    .await;
                    Err(AuthError::InvalidCredentials)
                }
            };
        }

        self.lockout.handle_successful_login(&mut user.security);
        user.last_login_at = Some(now);
        self.users.save(&user).await?;

        let response = self.open_session(&user, ip_address, user_agent).await?;

        self.record(Some(user.id), SecurityEventType::LoginSuccess, json!({}))
            .await;
        self.publisher.publish(AuthEvent::UserLoggedIn {
            user_id: user.id,
            session_id: response.session_id.clone(),
            logged_in_at: now,
        });

        tracing::info!("User logged in: {}", email);
        Ok(response)
    }

    /// Always reports success: the caller's intent ("I am no longer
    /// authenticated") is satisfied locally even if backend cleanup fails.
    pub async fn logout(&self, session_id: &str, refresh_token: &str) {
        let user_id = self.tokens.decode(refresh_token).ok().and_then(|c| c.user_id());

        if let Err(e) = self.tokens.revoke(refresh_token).await {
            tracing::warn!("Logout: token revocation failed: {}", e);
        }
        match self.sessions.delete(session_id).await {
            Ok(_) => {}
            Err(e) => tracing::warn!("Logout: session deletion failed: {}", e),
        }

        self.record(
            user_id,
            SecurityEventType::Logout,
            json!({ "session_id": session_id }),
        )
        .await;
        if let Some(user_id) = user_id {
            self.publisher.publish(AuthEvent::UserLoggedOut {
                user_id,
                session_id: session_id.to_string(),
                logged_out_at: Utc::now(),
            });
        }
    }

    /// Rotate the token pair. The session record is the source of truth for
    /// whether the refresh token's session is still alive; token validity
    /// alone is not enough, since sessions can be terminated early.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthResponse> {
        let claims = self.tokens.validate(refresh_token, TokenType::Refresh).await?;
        let session = self.sessions.get(&claims.sid).await?;

        let user_id = claims.user_id().ok_or(AuthError::TokenInvalid)?;
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        if !user.is_active {
            return Err(AuthError::AccountInactive);
        }

        // Old refresh token dies with the rotation; the session record is
        // re-extended in the same logical step that issues the new one.
        self.tokens.revoke(refresh_token).await?;
        self.sessions.touch(&session.session_id).await?;

        let new_refresh = self
            .tokens
            .issue_refresh_token(user.id, &session.session_id, Default::default())
            .await?;
        let new_access = self
            .tokens
            .issue_access_token(user.id, &session.session_id, Default::default())
            .await?;

        self.record(Some(user.id), SecurityEventType::TokenRefreshed, json!({}))
            .await;

        Ok(AuthResponse {
            user_id: user.id,
            session_id: session.session_id,
            access_token: new_access.token,
            refresh_token: new_refresh.token,
            expires_in: self.tokens.access_ttl_secs(),
        })
    }

    pub async fn change_password(
        &self,
        user_id: Uuid,
        old_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let mut user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        self.hasher.verify(old_password, &user.password_hash)?;
        user.password_hash = self.hasher.hash(new_password)?;
        self.users.save(&user).await?;

        self.invalidate_all_credentials(user_id).await?;

        self.record(Some(user_id), SecurityEventType::PasswordChanged, json!({}))
            .await;
        self.publisher.publish(AuthEvent::PasswordChanged {
            user_id,
            changed_at: Utc::now(),
            invalidate_all_sessions: true,
        });

        tracing::info!("Password changed for user: {}", user_id);
        Ok(())
    }

    /// Always reports success to avoid user enumeration. The reset token is
    /// returned for the out-of-scope delivery collaborator; it is `None`
    /// when the email is unknown or the account inactive.
    pub async fn forgot_password(&self, email: &str) -> Result<Option<String>> {
        let Some(user) = self.users.find_by_email(email).await? else {
            return Ok(None);
        };
        if !user.is_active {
            return Ok(None);
        }

        let mut extra = serde_json::Map::new();
        extra.insert("purpose".to_string(), PURPOSE_PASSWORD_RESET.into());
        let issued = self
            .tokens
            .issue_with_ttl(
                user.id,
                "",
                TokenType::Access,
                self.password_reset_ttl_secs,
                extra,
            )
            .await?;

        self.record(
            Some(user.id),
            SecurityEventType::PasswordResetRequested,
            json!({}),
        )
        .await;

        Ok(Some(issued.token))
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<()> {
        let claims = self
            .tokens
            .validate_purpose(token, PURPOSE_PASSWORD_RESET)
            .await?;

        let user_id = claims.user_id().ok_or(AuthError::TokenInvalid)?;
        let mut user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::TokenInvalid)?;

        user.password_hash = self.hasher.hash(new_password)?;
        self.users.save(&user).await?;

        // Bulk revocation covers the reset token itself via its metadata.
        self.invalidate_all_credentials(user_id).await?;

        self.record(
            Some(user_id),
            SecurityEventType::PasswordResetCompleted,
            json!({}),
        )
        .await;
        self.publisher.publish(AuthEvent::PasswordChanged {
            user_id,
            changed_at: Utc::now(),
            invalidate_all_sessions: true,
        });

        Ok(())
    }

    pub async fn list_sessions(&self, user_id: Uuid) -> Result<Vec<SessionRecord>> {
        let ids = self.sessions.find_by_user(user_id).await?;
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            match self.sessions.get(&id).await {
                Ok(record) => records.push(record),
                Err(AuthError::SessionNotFound) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(records)
    }

    /// Terminate one of the user's other sessions. Terminating the session
    /// the caller is currently on is rejected; logout exists for that.
    pub async fn terminate_session(
        &self,
        user_id: Uuid,
        target_session_id: &str,
        current_session_id: &str,
    ) -> Result<()> {
        if target_session_id == current_session_id {
            return Err(AuthError::Validation(
                "cannot terminate the current session; use logout".to_string(),
            ));
        }

        let record = self.sessions.get(target_session_id).await?;
        if record.user_id != user_id {
            // Do not reveal that the session exists at all.
            return Err(AuthError::SessionNotFound);
        }

        self.sessions.delete(target_session_id).await?;
        self.record(
            Some(user_id),
            SecurityEventType::SessionTerminated,
            json!({ "session_id": target_session_id }),
        )
        .await;

        Ok(())
    }

    pub async fn security_events(
        &self,
        user_id: Uuid,
        query: EventQuery,
    ) -> Result<Vec<crate::models::SecurityEvent>> {
        self.recorder.query(Some(user_id), query).await
    }

    /// Mint a session and a token pair bound to it.
    async fn open_session(
        &self,
        user: &User,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Result<AuthResponse> {
        let session = self
            .sessions
            .create(user.id, json!({}), ip_address, user_agent)
            .await?;

        let refresh = self
            .tokens
            .issue_refresh_token(user.id, &session.session_id, Default::default())
            .await?;
        let access = self
            .tokens
            .issue_access_token(user.id, &session.session_id, Default::default())
            .await?;

        Ok(AuthResponse {
            user_id: user.id,
            session_id: session.session_id,
            access_token: access.token,
            refresh_token: refresh.token,
            expires_in: self.tokens.access_ttl_secs(),
        })
    }

    /// Password change/reset both end every live token and session.
    async fn invalidate_all_credentials(&self, user_id: Uuid) -> Result<()> {
        self.tokens.revoke_all_for_user(user_id).await?;
        self.sessions.delete_all_for_user(user_id).await?;
        Ok(())
    }

    async fn record(
        &self,
        user_id: Option<Uuid>,
        event_type: SecurityEventType,
        data: serde_json::Value,
    ) {
        if let Err(e) = self.recorder.record(user_id, event_type, data).await {
            tracing::warn!("Failed to record security event {:?}: {}", event_type, e);
        }
    }
}
