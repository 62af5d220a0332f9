pub mod user_cache;
pub mod user_repo;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::User;

pub use user_cache::CachedUserRepository;
pub use user_repo::PgUserRepository;

/// Relational persistence of user rows, consumed at its interface boundary.
/// Lockout state lives on the row itself, so it survives independently of
/// session and token TTLs.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>>;

    /// Fails with `AlreadyExists` on an email collision.
    async fn create(&self, email: &str, username: &str, password_hash: &str) -> Result<User>;

    /// Persist mutated fields of the aggregate (password hash, activity
    /// flags, lockout counters, last-login bookkeeping).
    async fn save(&self, user: &User) -> Result<()>;
}
