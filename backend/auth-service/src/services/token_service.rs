/// Token issuance, validation and revocation
///
/// Composes the codec with the revocation registry. Every issuance also
/// writes a metadata entry under `token:metadata:{userId}:{tokenHash}` with
/// TTL equal to the token's lifetime, so "revoke everything this user
/// holds" is a prefix scan over currently-live tokens rather than a walk of
/// all history.
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use kv_store::KeyValueStore;
use uuid::Uuid;

use crate::error::{AuthError, Result};
use crate::models::{Claims, TokenMetadata, TokenType};
use crate::security::token_revocation::sha256_hash;
use crate::security::{RevocationRegistry, TokenCodec};

const METADATA_PREFIX: &str = "token:metadata:";

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct TokenService {
    codec: TokenCodec,
    revocations: RevocationRegistry,
    store: Arc<dyn KeyValueStore>,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl TokenService {
    pub fn new(
        codec: TokenCodec,
        store: Arc<dyn KeyValueStore>,
        access_ttl_secs: i64,
        refresh_ttl_secs: i64,
    ) -> Self {
        Self {
            codec,
            revocations: RevocationRegistry::new(store.clone()),
            store,
            access_ttl_secs,
            refresh_ttl_secs,
        }
    }

    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl_secs
    }

    pub fn refresh_ttl_secs(&self) -> i64 {
        self.refresh_ttl_secs
    }

    pub async fn issue_access_token(
        &self,
        user_id: Uuid,
        session_id: &str,
        extra: serde_json::Map<String, serde_json::Value>,
    ) -> Result<IssuedToken> {
        self.issue(user_id, session_id, TokenType::Access, self.access_ttl_secs, extra)
            .await
    }

    pub async fn issue_refresh_token(
        &self,
        user_id: Uuid,
        session_id: &str,
        extra: serde_json::Map<String, serde_json::Value>,
    ) -> Result<IssuedToken> {
        self.issue(
            user_id,
            session_id,
            TokenType::Refresh,
            self.refresh_ttl_secs,
            extra,
        )
        .await
    }

    /// Issue a token with a caller-chosen lifetime (password-reset tokens).
    pub async fn issue_with_ttl(
        &self,
        user_id: Uuid,
        session_id: &str,
        token_type: TokenType,
        ttl_secs: i64,
        extra: serde_json::Map<String, serde_json::Value>,
    ) -> Result<IssuedToken> {
        self.issue(user_id, session_id, token_type, ttl_secs, extra).await
    }

    async fn issue(
        &self,
        user_id: Uuid,
        session_id: &str,
        token_type: TokenType,
        ttl_secs: i64,
        extra: serde_json::Map<String, serde_json::Value>,
    ) -> Result<IssuedToken> {
        let claims = Claims::new(user_id, session_id, token_type, ttl_secs).with_extra(extra);
        let token = self.codec.sign(&claims)?;
        let expires_at = timestamp_to_datetime(claims.exp);

        let metadata = TokenMetadata {
            user_id,
            token_type,
            created_at: timestamp_to_datetime(claims.iat),
            expires_at,
        };
        let key = metadata_key(user_id, &sha256_hash(&token));
        self.store
            .set(
                &key,
                &serde_json::to_string(&metadata)?,
                Some(ttl_secs.max(0) as u64),
            )
            .await?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Decode claims without consulting the revocation registry. Used where
    /// only the embedded identity matters (logout bookkeeping).
    pub fn decode(&self, token: &str) -> Result<Claims> {
        self.codec.verify(token)
    }

    /// Read-only validation: signature, expiry, type, then revocation. Never
    /// extends or mutates token or session state. Purpose-marked tokens are
    /// rejected: they are single-use capabilities, not credentials, and must
    /// never authenticate ordinary API calls.
    pub async fn validate(&self, token: &str, expected_type: TokenType) -> Result<Claims> {
        let claims = self.checked(token, expected_type).await?;

        if claims.purpose().is_some() {
            return Err(AuthError::TokenWrongType);
        }

        Ok(claims)
    }

    /// Validate a purpose-marked token. Only accepts tokens carrying exactly
    /// `expected_purpose` in their claims.
    pub async fn validate_purpose(&self, token: &str, expected_purpose: &str) -> Result<Claims> {
        let claims = self.checked(token, TokenType::Access).await?;

        if claims.purpose() != Some(expected_purpose) {
            return Err(AuthError::TokenInvalid);
        }

        Ok(claims)
    }

    async fn checked(&self, token: &str, expected_type: TokenType) -> Result<Claims> {
        let claims = self.codec.verify(token)?;

        if claims.token_type != expected_type {
            return Err(AuthError::TokenWrongType);
        }

        if self.revocations.is_revoked(token).await? {
            return Err(AuthError::TokenRevoked);
        }

        Ok(claims)
    }

    /// Ensure the token can no longer be used. An already-expired or
    /// malformed token is a successful revoke, not an error.
    pub async fn revoke(&self, token: &str) -> Result<()> {
        match self.codec.verify(token) {
            Ok(claims) => {
                let remaining = claims.exp - Utc::now().timestamp();
                self.revocations.revoke(token, remaining).await
            }
            Err(AuthError::TokenExpired) | Err(AuthError::TokenInvalid) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Two-phase bulk revoke: list the user's metadata keys, then issue one
    /// revoke per live token with that token's own remaining TTL. Partial
    /// completion under failure is tolerable because re-running is safe.
    pub async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<usize> {
        let pattern = format!("{}{}:*", METADATA_PREFIX, user_id);
        let keys = self.store.scan(&pattern).await?;

        let now = Utc::now();
        let mut revoked = 0;
        for key in &keys {
            let Some(value) = self.store.get(key).await? else {
                // Metadata expired between scan and read; the token is
                // already unusable.
                continue;
            };
            let metadata: TokenMetadata = serde_json::from_str(&value)?;
            let remaining = (metadata.expires_at - now).num_seconds();
            let Some(token_hash) = key.rsplit(':').next() else {
                continue;
            };
            self.revocations.revoke_hash(token_hash, remaining).await?;
            revoked += 1;
        }

        tracing::warn!("All tokens revoked for user: {} ({} live)", user_id, revoked);
        Ok(revoked)
    }
}

fn metadata_key(user_id: Uuid, token_hash: &str) -> String {
    format!("{}{}:{}", METADATA_PREFIX, user_id, token_hash)
}

fn timestamp_to_datetime(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kv_store::MemoryStore;

    fn service(store: Arc<MemoryStore>) -> TokenService {
        TokenService::new(TokenCodec::new("test-secret"), store, 900, 604_800)
    }

    #[tokio::test]
    async fn test_issue_and_validate() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(store.clone());
        let user_id = Uuid::new_v4();

        let issued = svc
            .issue_access_token(user_id, "sess-1", Default::default())
            .await
            .unwrap();

        let claims = svc.validate(&issued.token, TokenType::Access).await.unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.sid, "sess-1");

        // Issuance leaves exactly one metadata entry for the token.
        let keys = store
            .scan(&format!("token:metadata:{}:*", user_id))
            .await
            .unwrap();
        assert_eq!(keys.len(), 1);
    }

    #[tokio::test]
    async fn test_back_to_back_issuance_yields_distinct_tokens() {
        let svc = service(Arc::new(MemoryStore::new()));
        let user_id = Uuid::new_v4();

        // Both tokens land in the same second, so without a unique id in
        // the payload they would sign to identical bytes and revoking one
        // would blacklist the other.
        let first = svc
            .issue_refresh_token(user_id, "sess-1", Default::default())
            .await
            .unwrap();
        let second = svc
            .issue_refresh_token(user_id, "sess-1", Default::default())
            .await
            .unwrap();
        assert_ne!(first.token, second.token);

        svc.revoke(&first.token).await.unwrap();
        assert!(svc
            .validate(&second.token, TokenType::Refresh)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_purpose_token_rejected_as_credential() {
        let svc = service(Arc::new(MemoryStore::new()));

        let mut extra = serde_json::Map::new();
        extra.insert("purpose".to_string(), "password-reset".into());
        let issued = svc
            .issue_with_ttl(Uuid::new_v4(), "", TokenType::Access, 3600, extra)
            .await
            .unwrap();

        // Never usable as an ordinary access token...
        let result = svc.validate(&issued.token, TokenType::Access).await;
        assert!(matches!(result, Err(AuthError::TokenWrongType)));

        // ...only through the purpose-checked path.
        assert!(svc
            .validate_purpose(&issued.token, "password-reset")
            .await
            .is_ok());
        let result = svc.validate_purpose(&issued.token, "email-change").await;
        assert!(matches!(result, Err(AuthError::TokenInvalid)));
    }

    #[tokio::test]
    async fn test_plain_token_rejected_by_purpose_check() {
        let svc = service(Arc::new(MemoryStore::new()));
        let issued = svc
            .issue_access_token(Uuid::new_v4(), "s", Default::default())
            .await
            .unwrap();

        let result = svc.validate_purpose(&issued.token, "password-reset").await;
        assert!(matches!(result, Err(AuthError::TokenInvalid)));
    }

    #[tokio::test]
    async fn test_validate_wrong_type() {
        let svc = service(Arc::new(MemoryStore::new()));
        let issued = svc
            .issue_refresh_token(Uuid::new_v4(), "s", Default::default())
            .await
            .unwrap();

        let result = svc.validate(&issued.token, TokenType::Access).await;
        assert!(matches!(result, Err(AuthError::TokenWrongType)));
    }

    #[tokio::test]
    async fn test_revoked_token_fails_validation() {
        let svc = service(Arc::new(MemoryStore::new()));
        let issued = svc
            .issue_access_token(Uuid::new_v4(), "s", Default::default())
            .await
            .unwrap();

        svc.revoke(&issued.token).await.unwrap();

        let result = svc.validate(&issued.token, TokenType::Access).await;
        assert!(matches!(result, Err(AuthError::TokenRevoked)));

        // Revoking again is a safe no-op.
        svc.revoke(&issued.token).await.unwrap();
        let result = svc.validate(&issued.token, TokenType::Access).await;
        assert!(matches!(result, Err(AuthError::TokenRevoked)));
    }

    #[tokio::test]
    async fn test_revoke_expired_token_succeeds_without_tombstone() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(store.clone());

        // Sign an already-expired token with the same secret.
        let codec = TokenCodec::new("test-secret");
        let claims = Claims::new(Uuid::new_v4(), "s", TokenType::Access, -60);
        let token = codec.sign(&claims).unwrap();

        svc.revoke(&token).await.unwrap();
        assert!(store.scan("token:blacklist:*").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_revoke_garbage_token_succeeds() {
        let svc = service(Arc::new(MemoryStore::new()));
        svc.revoke("definitely-not-a-jwt").await.unwrap();
    }

    #[tokio::test]
    async fn test_revoke_all_for_user() {
        let svc = service(Arc::new(MemoryStore::new()));
        let user_id = Uuid::new_v4();
        let other_user = Uuid::new_v4();

        let t1 = svc
            .issue_access_token(user_id, "s1", Default::default())
            .await
            .unwrap();
        let t2 = svc
            .issue_refresh_token(user_id, "s1", Default::default())
            .await
            .unwrap();
        let t3 = svc
            .issue_access_token(user_id, "s2", Default::default())
            .await
            .unwrap();
        let unaffected = svc
            .issue_access_token(other_user, "s3", Default::default())
            .await
            .unwrap();

        let revoked = svc.revoke_all_for_user(user_id).await.unwrap();
        assert_eq!(revoked, 3);

        for issued in [&t1, &t3] {
            let result = svc.validate(&issued.token, TokenType::Access).await;
            assert!(matches!(result, Err(AuthError::TokenRevoked)));
        }
        let result = svc.validate(&t2.token, TokenType::Refresh).await;
        assert!(matches!(result, Err(AuthError::TokenRevoked)));

        // The other user's token still validates.
        assert!(svc
            .validate(&unaffected.token, TokenType::Access)
            .await
            .is_ok());
    }
}
