use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Extra claim marking a token as usable only for completing a password
/// reset.
pub const PURPOSE_PASSWORD_RESET: &str = "password-reset";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenType::Access => write!(f, "access"),
            TokenType::Refresh => write!(f, "refresh"),
        }
    }
}

/// Claims embedded in a signed token. Tokens are immutable once issued; a
/// "new" token is always a new set of claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id).
    pub sub: String,
    /// Session the token is bound to.
    pub sid: String,
    pub token_type: TokenType,
    /// Unique token id. `iat`/`exp` have second granularity, so without it
    /// two tokens minted in the same second for the same subject would sign
    /// to the same bytes and share one revocation tombstone.
    pub jti: String,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration time (Unix timestamp), checked by the codec.
    pub exp: i64,
    /// Optional extra claims (roles, purpose markers).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Claims {
    pub fn new(user_id: Uuid, session_id: &str, token_type: TokenType, ttl_secs: i64) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id.to_string(),
            sid: session_id.to_string(),
            token_type,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: now.timestamp() + ttl_secs,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_extra(mut self, extra: serde_json::Map<String, serde_json::Value>) -> Self {
        self.extra = extra;
        self
    }

    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }

    pub fn purpose(&self) -> Option<&str> {
        self.extra.get("purpose").and_then(|v| v.as_str())
    }
}

/// Per-token bookkeeping kept under `token:metadata:{userId}:{tokenHash}`,
/// with TTL equal to the token's lifetime. Enables revoking all of a user's
/// tokens without a global scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub user_id: Uuid,
    pub token_type: TokenType,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
