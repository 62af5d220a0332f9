/// Test fixtures and helpers for auth-service tests
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use kv_store::MemoryStore;
use uuid::Uuid;

use crate::db::UserRepository;
use crate::error::{AuthError, Result};
use crate::models::User;
use crate::security::{Argon2PasswordHasher, LockoutPolicy, TokenCodec};
use crate::services::{
    AuthService, EventPublisher, SecurityEventRecorder, SessionStore, TokenService,
};

pub const TEST_EMAIL: &str = "alice@example.com";
pub const TEST_USERNAME: &str = "alice";
pub const TEST_PASSWORD: &str = "Password123!";
pub const WRONG_PASSWORD: &str = "WrongPass456!";

pub const TEST_JWT_SECRET: &str = "test-secret";
pub const ACCESS_TTL_SECS: i64 = 900;
pub const REFRESH_TTL_SECS: i64 = 604_800;
pub const MAX_FAILED_ATTEMPTS: u32 = 5;
pub const LOCKOUT_DURATION_SECS: i64 = 1800;

/// In-memory stand-in for the relational user repository.
#[derive(Default)]
pub struct MemoryUserRepository {
    users: Mutex<HashMap<Uuid, User>>,
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.lock().unwrap();
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>> {
        let users = self.users.lock().unwrap();
        Ok(users.get(&user_id).cloned())
    }

    async fn create(&self, email: &str, username: &str, password_hash: &str) -> Result<User> {
        let mut users = self.users.lock().unwrap();
        if users.values().any(|u| u.email == email) {
            return Err(AuthError::AlreadyExists);
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            is_active: true,
            security: Default::default(),
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn save(&self, user: &User) -> Result<()> {
        let mut users = self.users.lock().unwrap();
        users.insert(user.id, user.clone());
        Ok(())
    }
}

impl MemoryUserRepository {
    pub fn deactivate(&self, user_id: Uuid) {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.get_mut(&user_id) {
            user.is_active = false;
        }
    }

    pub fn get(&self, user_id: Uuid) -> Option<User> {
        self.users.lock().unwrap().get(&user_id).cloned()
    }
}

/// Fully wired auth service over in-memory backends, with handles on the
/// collaborators so tests can inspect shared state.
pub struct TestHarness {
    pub auth: AuthService,
    pub tokens: Arc<TokenService>,
    pub sessions: SessionStore,
    pub users: Arc<MemoryUserRepository>,
    pub store: Arc<MemoryStore>,
}

pub fn harness() -> TestHarness {
    let store = Arc::new(MemoryStore::new());
    let users = Arc::new(MemoryUserRepository::default());
    let tokens = Arc::new(TokenService::new(
        TokenCodec::new(TEST_JWT_SECRET),
        store.clone(),
        ACCESS_TTL_SECS,
        REFRESH_TTL_SECS,
    ));
    let sessions = SessionStore::new(store.clone(), REFRESH_TTL_SECS);
    let recorder = SecurityEventRecorder::new(store.clone(), 7_776_000);
    let lockout = LockoutPolicy::new(MAX_FAILED_ATTEMPTS, LOCKOUT_DURATION_SECS);

    let auth = AuthService::new(
        users.clone(),
        Arc::new(Argon2PasswordHasher),
        tokens.clone(),
        sessions.clone(),
        lockout,
        recorder,
        EventPublisher::disabled(),
        3600,
    );

    TestHarness {
        auth,
        tokens,
        sessions,
        users,
        store,
    }
}

/// Register the standard test user and return the auth response.
pub async fn register_test_user(harness: &TestHarness) -> crate::models::AuthResponse {
    harness
        .auth
        .register(TEST_EMAIL, TEST_USERNAME, TEST_PASSWORD, None, None)
        .await
        .expect("registration should succeed")
}
