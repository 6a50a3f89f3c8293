//! In-memory store backend
//!
//! Implements every store trait on top of `DashMap`s. Not durable: all state
//! is lost on restart. Used by tests and by the binary when no database is
//! configured in debug builds.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{DashMap, mapref::entry::Entry};
use uuid::Uuid;

use super::{ResetTicketStore, RevokedTokenStore, StoreError, StoreResult, UserStore};
use crate::core::db::models::{ResetTicket, RevokedToken, User};

#[derive(Debug, Default)]
pub struct MemoryStore {
    users: DashMap<Uuid, User>,
    // email -> id; claimed before the user row is written
    emails: DashMap<String, Uuid>,
    revoked: DashMap<String, Vec<RevokedToken>>,
    // keyed by secret digest
    tickets: DashMap<String, ResetTicket>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of revocation records, duplicates included
    pub fn revoked_count(&self) -> usize {
        self.revoked.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn ticket_count(&self) -> usize {
        self.tickets.len()
    }
}

#[async_trait]
impl RevokedTokenStore for MemoryStore {
    async fn find_by_token_hash(&self, token_hash: &str) -> StoreResult<Option<RevokedToken>> {
        Ok(self
            .revoked
            .get(token_hash)
            .and_then(|records| records.first().cloned()))
    }

    async fn insert(&self, record: RevokedToken) -> StoreResult<()> {
        self.revoked
            .entry(record.token_hash.clone())
            .or_default()
            .push(record);
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut purged = 0u64;
        self.revoked.retain(|_, records| {
            let before = records.len();
            records.retain(|record| record.expires_at >= now);
            purged += (before - records.len()) as u64;
            !records.is_empty()
        });
        Ok(purged)
    }
}

#[async_trait]
impl ResetTicketStore for MemoryStore {
    async fn insert(&self, ticket: ResetTicket) -> StoreResult<()> {
        self.tickets.insert(ticket.secret_hash.clone(), ticket);
        Ok(())
    }

    async fn find_live(
        &self,
        secret_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<ResetTicket>> {
        Ok(self
            .tickets
            .get(secret_hash)
            .filter(|ticket| ticket.is_redeemable(now))
            .map(|ticket| ticket.clone()))
    }

    async fn consume(
        &self,
        secret_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<ResetTicket>> {
        // get_mut holds the shard write lock across check and set
        let Some(mut ticket) = self.tickets.get_mut(secret_hash) else {
            return Ok(None);
        };
        if !ticket.is_redeemable(now) {
            return Ok(None);
        }
        ticket.used = true;
        Ok(Some(ticket.clone()))
    }

    async fn purge_expired(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let before = self.tickets.len();
        self.tickets.retain(|_, ticket| ticket.expires_at >= cutoff);
        Ok((before - self.tickets.len()) as u64)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn count_by_email(&self, email: &str) -> StoreResult<i64> {
        Ok(i64::from(self.emails.contains_key(email)))
    }

    async fn insert(&self, user: User) -> StoreResult<()> {
        match self.emails.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(
                "email already registered".to_string(),
            )),
            Entry::Vacant(slot) => {
                slot.insert(user.id);
                self.users.insert(user.id, user);
                Ok(())
            }
        }
    }

    async fn find_active_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.value().email == email && !entry.value().is_deleted)
            .map(|entry| entry.value().clone()))
    }

    async fn find_active_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self
            .users
            .get(&id)
            .filter(|user| !user.is_deleted)
            .map(|user| user.clone()))
    }

    async fn update_password_hash(
        &self,
        id: Uuid,
        password_hash: &str,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        match self.users.get_mut(&id) {
            Some(mut user) => {
                user.password_hash = password_hash.to_string();
                user.updated_at = updated_at;
                Ok(1)
            }
            None => Ok(0),
        }
    }
}
