//! User repository for database operations
//!
//! The credential core only reads accounts for login/reset and rewrites the
//! password hash on reset completion; profile CRUD lives elsewhere.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{StoreError, StoreResult};
use crate::core::db::models::User;

/// Storage operations on accounts used by the credential core
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Count accounts (deleted or not) registered under `email`
    async fn count_by_email(&self, email: &str) -> StoreResult<i64>;

    /// Insert a new account. Fails with [`StoreError::Duplicate`] when the
    /// email is already taken, deleted accounts included.
    async fn insert(&self, user: User) -> StoreResult<()>;

    /// Find a non-deleted account by email
    async fn find_active_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Find a non-deleted account by id
    async fn find_active_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Replace the password hash, returning the matched row count
    async fn update_password_hash(
        &self,
        id: Uuid,
        password_hash: &str,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<u64>;
}

/// PostgreSQL-backed account store
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn count_by_email(&self, email: &str) -> StoreResult<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = $1")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }

    async fn insert(&self, user: User) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, created_at, updated_at, is_deleted)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .bind(user.updated_at)
        .bind(user.is_deleted)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                StoreError::Duplicate("email already registered".to_string())
            }
            other => StoreError::Database(other),
        })?;

        Ok(())
    }

    async fn find_active_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, created_at, updated_at, is_deleted
            FROM users
            WHERE email = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_active_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, created_at, updated_at, is_deleted
            FROM users
            WHERE id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn update_password_hash(
        &self,
        id: Uuid,
        password_hash: &str,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .bind(updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
