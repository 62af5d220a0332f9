/// Session record lifecycle
///
/// Primary records live under `session:{sessionId}` with TTL equal to the
/// refresh-token lifetime; a `session:byUser:{userId}` set is the secondary
/// index, so listing or bulk-deleting a user's sessions needs no full scan.
/// The two writes are independent calls (no cross-key transaction), so the
/// index may briefly hold ids whose primary record has expired; readers
/// prune those lazily.
use std::sync::Arc;

use chrono::{Duration, Utc};
use kv_store::KeyValueStore;
use uuid::Uuid;

use crate::error::{AuthError, Result};
use crate::models::{SessionRecord, SessionUpdate};

#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
    session_ttl_secs: i64,
}

fn session_key(session_id: &str) -> String {
    format!("session:{}", session_id)
}

fn user_index_key(user_id: Uuid) -> String {
    format!("session:byUser:{}", user_id)
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>, session_ttl_secs: i64) -> Self {
        Self {
            store,
            session_ttl_secs,
        }
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        data: serde_json::Value,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Result<SessionRecord> {
        let now = Utc::now();
        let record = SessionRecord {
            session_id: Uuid::new_v4().to_string(),
            user_id,
            created_at: now,
            last_accessed_at: now,
            expires_at: now + Duration::seconds(self.session_ttl_secs),
            ip_address,
            user_agent,
            data,
        };

        self.write(&record).await?;
        self.store
            .sadd(&user_index_key(user_id), &record.session_id)
            .await?;

        tracing::info!("Session created: {} for user {}", record.session_id, user_id);
        Ok(record)
    }

    pub async fn get(&self, session_id: &str) -> Result<SessionRecord> {
        let value = self
            .store
            .get(&session_key(session_id))
            .await?
            .ok_or(AuthError::SessionNotFound)?;
        let record: SessionRecord = serde_json::from_str(&value)?;
        if record.is_expired() {
            return Err(AuthError::SessionNotFound);
        }
        Ok(record)
    }

    pub async fn update(&self, session_id: &str, update: SessionUpdate) -> Result<SessionRecord> {
        let mut record = self.get(session_id).await?;
        if let Some(ip) = update.ip_address {
            record.ip_address = Some(ip);
        }
        if let Some(ua) = update.user_agent {
            record.user_agent = Some(ua);
        }
        if let Some(data) = update.data {
            record.data = data;
        }
        record.last_accessed_at = Utc::now();
        self.write(&record).await?;
        Ok(record)
    }

    /// Re-extend the record for a freshly minted refresh token: called in
    /// the same logical step that issues the new token, so the session's
    /// expiry stays bound to the lifetime of the newest refresh token.
    pub async fn touch(&self, session_id: &str) -> Result<SessionRecord> {
        let mut record = self.get(session_id).await?;
        let now = Utc::now();
        record.last_accessed_at = now;
        record.expires_at = now + Duration::seconds(self.session_ttl_secs);
        self.write(&record).await?;
        Ok(record)
    }

    /// Returns `true` if the session existed.
    pub async fn delete(&self, session_id: &str) -> Result<bool> {
        // Read first so the index entry can be removed too.
        let user_id = match self.get(session_id).await {
            Ok(record) => Some(record.user_id),
            Err(AuthError::SessionNotFound) => None,
            Err(e) => return Err(e),
        };

        let existed = self.store.delete(&session_key(session_id)).await?;
        if let Some(user_id) = user_id {
            self.store
                .srem(&user_index_key(user_id), session_id)
                .await?;
        }
        Ok(existed)
    }

    /// Live session ids for the user; stale index entries are pruned on the
    /// way through.
    pub async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<String>> {
        let index_key = user_index_key(user_id);
        let candidates = self.store.smembers(&index_key).await?;

        let mut live = Vec::with_capacity(candidates.len());
        for session_id in candidates {
            if self.store.exists(&session_key(&session_id)).await? {
                live.push(session_id);
            } else {
                self.store.srem(&index_key, &session_id).await?;
            }
        }
        Ok(live)
    }

    pub async fn delete_all_for_user(&self, user_id: Uuid) -> Result<usize> {
        let index_key = user_index_key(user_id);
        let session_ids = self.store.smembers(&index_key).await?;

        let mut deleted = 0;
        for session_id in &session_ids {
            if self.store.delete(&session_key(session_id)).await? {
                deleted += 1;
            }
            self.store.srem(&index_key, session_id).await?;
        }

        tracing::info!("Deleted {} sessions for user {}", deleted, user_id);
        Ok(deleted)
    }

    async fn write(&self, record: &SessionRecord) -> Result<()> {
        let ttl = (record.expires_at - Utc::now()).num_seconds().max(0) as u64;
        self.store
            .set(
                &session_key(&record.session_id),
                &serde_json::to_string(record)?,
                Some(ttl),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kv_store::MemoryStore;
    use serde_json::json;

    const REFRESH_TTL: i64 = 604_800;

    fn store() -> SessionStore {
        SessionStore::new(Arc::new(MemoryStore::new()), REFRESH_TTL)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let sessions = store();
        let user_id = Uuid::new_v4();

        let created = sessions
            .create(
                user_id,
                json!({"device": "ios"}),
                Some("10.0.0.1".to_string()),
                Some("test-agent".to_string()),
            )
            .await
            .unwrap();

        let fetched = sessions.get(&created.session_id).await.unwrap();
        assert_eq!(fetched.user_id, user_id);
        assert_eq!(fetched.ip_address.as_deref(), Some("10.0.0.1"));
        assert_eq!(fetched.data, json!({"device": "ios"}));

        // Expiry is bound to the refresh-token lifetime.
        assert_eq!(
            fetched.expires_at,
            fetched.created_at + Duration::seconds(REFRESH_TTL)
        );
    }

    #[tokio::test]
    async fn test_get_missing_session() {
        let result = store().get("no-such-session").await;
        assert!(matches!(result, Err(AuthError::SessionNotFound)));
    }

    #[tokio::test]
    async fn test_update_partial() {
        let sessions = store();
        let created = sessions
            .create(Uuid::new_v4(), json!({}), None, None)
            .await
            .unwrap();

        let updated = sessions
            .update(
                &created.session_id,
                SessionUpdate {
                    ip_address: Some("10.0.0.2".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.ip_address.as_deref(), Some("10.0.0.2"));
        assert!(updated.last_accessed_at >= created.last_accessed_at);
    }

    #[tokio::test]
    async fn test_touch_extends_expiry() {
        let sessions = store();
        let created = sessions
            .create(Uuid::new_v4(), json!({}), None, None)
            .await
            .unwrap();

        let touched = sessions.touch(&created.session_id).await.unwrap();
        assert!(touched.expires_at >= created.expires_at);
        assert_eq!(
            touched.expires_at,
            touched.last_accessed_at + Duration::seconds(REFRESH_TTL)
        );
    }

    #[tokio::test]
    async fn test_delete_removes_record_and_index() {
        let sessions = store();
        let user_id = Uuid::new_v4();
        let created = sessions
            .create(user_id, json!({}), None, None)
            .await
            .unwrap();

        assert!(sessions.delete(&created.session_id).await.unwrap());
        assert!(matches!(
            sessions.get(&created.session_id).await,
            Err(AuthError::SessionNotFound)
        ));
        assert!(sessions.find_by_user(user_id).await.unwrap().is_empty());

        // Deleting again reports absence.
        assert!(!sessions.delete(&created.session_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_find_by_user_and_delete_all() {
        let sessions = store();
        let user_id = Uuid::new_v4();
        let other = Uuid::new_v4();

        let s1 = sessions.create(user_id, json!({}), None, None).await.unwrap();
        let s2 = sessions.create(user_id, json!({}), None, None).await.unwrap();
        let theirs = sessions.create(other, json!({}), None, None).await.unwrap();

        let mut found = sessions.find_by_user(user_id).await.unwrap();
        found.sort();
        let mut expected = vec![s1.session_id.clone(), s2.session_id.clone()];
        expected.sort();
        assert_eq!(found, expected);

        let deleted = sessions.delete_all_for_user(user_id).await.unwrap();
        assert_eq!(deleted, 2);
        assert!(sessions.find_by_user(user_id).await.unwrap().is_empty());

        // The other user's session is untouched.
        assert!(sessions.get(&theirs.session_id).await.is_ok());
    }
}
