/// Token revocation registry (blacklist)
///
/// Tombstones live under `token:blacklist:{sha256(token)}` with a TTL equal
/// to the token's remaining natural lifetime. That keeps blacklist storage
/// bounded by the number of currently valid tokens: an entry never outlives
/// the token it blacklists, and never expires before the token would have.
use std::sync::Arc;

use kv_store::KeyValueStore;
use sha2::{Digest, Sha256};

use crate::error::Result;

const BLACKLIST_PREFIX: &str = "token:blacklist:";

#[derive(Clone)]
pub struct RevocationRegistry {
    store: Arc<dyn KeyValueStore>,
}

impl RevocationRegistry {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Write a tombstone for the token. A non-positive remaining TTL means
    /// the token has already expired naturally and needs no entry; revoking
    /// an already-revoked token simply rewrites the tombstone, so the
    /// operation is idempotent.
    pub async fn revoke(&self, token: &str, remaining_ttl_secs: i64) -> Result<()> {
        self.revoke_hash(&sha256_hash(token), remaining_ttl_secs)
            .await
    }

    /// Same as [`Self::revoke`] but keyed by an already-computed token hash,
    /// used by the bulk-revoke path which only holds hashes.
    pub async fn revoke_hash(&self, token_hash: &str, remaining_ttl_secs: i64) -> Result<()> {
        if remaining_ttl_secs <= 0 {
            return Ok(());
        }

        let key = format!("{}{}", BLACKLIST_PREFIX, token_hash);
        self.store
            .set(&key, "1", Some(remaining_ttl_secs as u64))
            .await?;

        tracing::info!(
            "Token revoked, blacklist entry will expire in {} seconds",
            remaining_ttl_secs
        );
        Ok(())
    }

    /// Single key lookup.
    pub async fn is_revoked(&self, token: &str) -> Result<bool> {
        let key = format!("{}{}", BLACKLIST_PREFIX, sha256_hash(token));
        Ok(self.store.exists(&key).await?)
    }
}

/// Hash a token using SHA-256
pub fn sha256_hash(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kv_store::MemoryStore;

    fn registry() -> RevocationRegistry {
        RevocationRegistry::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_sha256_hash_consistency() {
        let token = "test_token_12345";
        assert_eq!(sha256_hash(token), sha256_hash(token));
    }

    #[test]
    fn test_sha256_hash_uniqueness() {
        assert_ne!(sha256_hash("token1"), sha256_hash("token2"));
    }

    #[tokio::test]
    async fn test_revoke_and_check() {
        let registry = registry();
        assert!(!registry.is_revoked("tok").await.unwrap());

        registry.revoke("tok", 600).await.unwrap();
        assert!(registry.is_revoked("tok").await.unwrap());
        assert!(!registry.is_revoked("other").await.unwrap());
    }

    #[tokio::test]
    async fn test_revoke_expired_token_is_noop() {
        let store = Arc::new(MemoryStore::new());
        let registry = RevocationRegistry::new(store.clone());

        registry.revoke("tok", 0).await.unwrap();
        registry.revoke("tok", -30).await.unwrap();

        assert!(!registry.is_revoked("tok").await.unwrap());
        // No tombstone was written at all.
        assert!(store.scan("token:blacklist:*").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let registry = registry();
        registry.revoke("tok", 600).await.unwrap();
        registry.revoke("tok", 600).await.unwrap();
        assert!(registry.is_revoked("tok").await.unwrap());
    }
}
