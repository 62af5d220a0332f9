//! TTL-capable key/value store abstraction shared by the backend services.
//!
//! All persistent auth state (revocation tombstones, token metadata, session
//! records, security event logs) lives behind the [`KeyValueStore`] trait.
//! The production implementation is [`RedisStore`]; [`MemoryStore`] backs the
//! test suites so they run without external services.

use async_trait::async_trait;
use thiserror::Error;

mod memory;
mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),

    #[error("stored value is not valid for key {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Atomic single-key operations with TTL, plus prefix scans and set
/// operations for secondary indexes. There are no cross-key transactions;
/// multi-key flows built on top of this trait are best-effort sequences of
/// independent calls.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Set `key` to `value`. A TTL of `Some(n)` expires the key after `n`
    /// seconds; `None` persists it until deleted.
    async fn set(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Returns `true` if the key existed.
    async fn delete(&self, key: &str) -> Result<bool>;

    async fn exists(&self, key: &str) -> Result<bool>;

    /// All keys matching a glob-style pattern (`*` wildcard). Bounded by the
    /// number of live keys under the pattern, since expired keys drop out.
    async fn scan(&self, pattern: &str) -> Result<Vec<String>>;

    async fn sadd(&self, key: &str, member: &str) -> Result<()>;

    async fn srem(&self, key: &str, member: &str) -> Result<()>;

    async fn smembers(&self, key: &str) -> Result<Vec<String>>;
}
