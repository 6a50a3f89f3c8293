//! Password reset ticket repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::StoreResult;
use crate::core::db::models::ResetTicket;

/// Storage operations for password reset tickets
#[async_trait]
pub trait ResetTicketStore: Send + Sync {
    async fn insert(&self, ticket: ResetTicket) -> StoreResult<()>;

    /// Find an unused ticket for `secret_hash` that expires strictly after `now`
    async fn find_live(
        &self,
        secret_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<ResetTicket>>;

    /// Atomically flip `used` from false to true on a live ticket.
    ///
    /// Returns the ticket as it was consumed, or `None` when no unused,
    /// unexpired ticket matches. Two racing callers can never both get `Some`.
    async fn consume(
        &self,
        secret_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<ResetTicket>>;

    /// Delete tickets that expired before `cutoff`
    async fn purge_expired(&self, cutoff: DateTime<Utc>) -> StoreResult<u64>;
}

/// PostgreSQL-backed reset ticket store
#[derive(Clone)]
pub struct ResetTicketRepository {
    pool: PgPool,
}

impl ResetTicketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResetTicketStore for ResetTicketRepository {
    async fn insert(&self, ticket: ResetTicket) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO reset_tickets (id, user_id, secret_hash, created_at, expires_at, used)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(ticket.id)
        .bind(ticket.user_id)
        .bind(&ticket.secret_hash)
        .bind(ticket.created_at)
        .bind(ticket.expires_at)
        .bind(ticket.used)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_live(
        &self,
        secret_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<ResetTicket>> {
        let ticket = sqlx::query_as::<_, ResetTicket>(
            r#"
            SELECT id, user_id, secret_hash, created_at, expires_at, used
            FROM reset_tickets
            WHERE secret_hash = $1 AND used = FALSE AND expires_at > $2
            "#,
        )
        .bind(secret_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ticket)
    }

    async fn consume(
        &self,
        secret_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<ResetTicket>> {
        // Single conditional UPDATE: the row lock makes the check-and-set atomic
        let ticket = sqlx::query_as::<_, ResetTicket>(
            r#"
            UPDATE reset_tickets
            SET used = TRUE
            WHERE secret_hash = $1 AND used = FALSE AND expires_at > $2
            RETURNING id, user_id, secret_hash, created_at, expires_at, used
            "#,
        )
        .bind(secret_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ticket)
    }

    async fn purge_expired(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM reset_tickets
            WHERE expires_at < $1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
