/// KV-backed read cache over a [`UserRepository`]
///
/// Caches `find_by_id` results under `user:info:{id}` with a short TTL.
/// Lockout reads on the login path deliberately bypass this cache (login
/// resolves users by email), so a locked account is never treated as
/// unlocked on a stale copy; mutations go through `save`, which drops the
/// cached entry before writing through.
use std::sync::Arc;

use async_trait::async_trait;
use kv_store::KeyValueStore;
use uuid::Uuid;

use crate::db::UserRepository;
use crate::error::Result;
use crate::models::User;

#[derive(Clone)]
pub struct CachedUserRepository {
    inner: Arc<dyn UserRepository>,
    store: Arc<dyn KeyValueStore>,
    ttl_secs: u64,
}

fn cache_key(user_id: Uuid) -> String {
    format!("user:info:{}", user_id)
}

impl CachedUserRepository {
    pub fn new(inner: Arc<dyn UserRepository>, store: Arc<dyn KeyValueStore>, ttl_secs: u64) -> Self {
        Self {
            inner,
            store,
            ttl_secs,
        }
    }
}

#[async_trait]
impl UserRepository for CachedUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.inner.find_by_email(email).await
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>> {
        let key = cache_key(user_id);
        if let Some(cached) = self.store.get(&key).await? {
            if let Ok(user) = serde_json::from_str::<User>(&cached) {
                return Ok(Some(user));
            }
            // Unreadable cache entries are dropped, not trusted.
            self.store.delete(&key).await?;
        }

        let user = self.inner.find_by_id(user_id).await?;
        if let Some(user) = &user {
            self.store
                .set(&key, &serde_json::to_string(user)?, Some(self.ttl_secs))
                .await?;
        }
        Ok(user)
    }

    async fn create(&self, email: &str, username: &str, password_hash: &str) -> Result<User> {
        self.inner.create(email, username, password_hash).await
    }

    async fn save(&self, user: &User) -> Result<()> {
        // Invalidate before write-through so a failed save cannot leave a
        // stale entry outliving the row.
        self.store.delete(&cache_key(user.id)).await?;
        self.inner.save(user).await
    }
}
