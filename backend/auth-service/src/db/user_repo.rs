use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::UserRepository;
use crate::error::{AuthError, Result};
use crate::models::User;

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create(&self, email: &str, username: &str, password_hash: &str) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, username, password_hash, is_active, failed_login_attempts, created_at, updated_at)
            VALUES (gen_random_uuid(), $1, $2, $3, true, 0, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if e.to_string().contains("unique constraint") {
                AuthError::AlreadyExists
            } else {
                AuthError::Database(e.to_string())
            }
        })?;

        Ok(user)
    }

    async fn save(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $1,
                is_active = $2,
                failed_login_attempts = $3,
                locked_until = $4,
                last_login_at = $5,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $6
            "#,
        )
        .bind(&user.password_hash)
        .bind(user.is_active)
        .bind(user.security.failed_login_attempts)
        .bind(user.security.locked_until)
        .bind(user.last_login_at)
        .bind(user.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
