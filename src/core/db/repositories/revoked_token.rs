//! Revoked token repository
//!
//! Durable blacklist of logged-out session tokens, keyed by token digest.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::StoreResult;
use crate::core::db::models::RevokedToken;

/// Storage operations for the revocation list
#[async_trait]
pub trait RevokedTokenStore: Send + Sync {
    /// Point lookup by token digest
    async fn find_by_token_hash(&self, token_hash: &str) -> StoreResult<Option<RevokedToken>>;

    /// Append a revocation record. Duplicates for the same digest are allowed.
    async fn insert(&self, record: RevokedToken) -> StoreResult<()>;

    /// Drop records whose token would have expired by `now`
    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64>;
}

/// PostgreSQL-backed revocation list
#[derive(Clone)]
pub struct RevokedTokenRepository {
    pool: PgPool,
}

impl RevokedTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RevokedTokenStore for RevokedTokenRepository {
    async fn find_by_token_hash(&self, token_hash: &str) -> StoreResult<Option<RevokedToken>> {
        let record = sqlx::query_as::<_, RevokedToken>(
            r#"
            SELECT token_hash, expires_at, revoked_at
            FROM revoked_tokens
            WHERE token_hash = $1
            LIMIT 1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn insert(&self, record: RevokedToken) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO revoked_tokens (token_hash, expires_at, revoked_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(&record.token_hash)
        .bind(record.expires_at)
        .bind(record.revoked_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM revoked_tokens
            WHERE expires_at < $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
