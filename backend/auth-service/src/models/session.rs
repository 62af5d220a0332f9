/// Session model
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One authenticated device/browser instance, correlated with but
/// independent of the tokens issued for it. The record's existence is the
/// source of truth for "is this refresh token's session still alive".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl SessionRecord {
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

/// Partial update applied by [`crate::services::SessionStore::update`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionUpdate {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub data: Option<serde_json::Value>,
}
