//! Revocation list for logged-out session tokens
//!
//! A thin layer over [`RevokedTokenStore`] that hides the digest scheme from
//! callers. Absence of a record is the only "not revoked" answer; every store
//! fault propagates so the session gate can fail closed.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::core::db::models::RevokedToken;
use crate::core::db::repositories::{RevokedTokenStore, StoreResult, hash_token};

#[derive(Clone)]
pub struct RevocationList {
    store: Arc<dyn RevokedTokenStore>,
}

impl RevocationList {
    pub fn new(store: Arc<dyn RevokedTokenStore>) -> Self {
        Self { store }
    }

    /// Point lookup by exact bearer value (no `Bearer ` prefix)
    pub async fn is_revoked(&self, token: &str) -> StoreResult<bool> {
        let record = self.store.find_by_token_hash(&hash_token(token)).await?;
        Ok(record.is_some())
    }

    /// Record `token` as revoked until its own expiry.
    ///
    /// Revoking the same token twice stores two records; lookups only care
    /// that one exists.
    pub async fn revoke(&self, token: &str, expires_at: DateTime<Utc>) -> StoreResult<()> {
        self.store
            .insert(RevokedToken {
                token_hash: hash_token(token),
                expires_at,
                revoked_at: Utc::now(),
            })
            .await
    }

    /// Drop records whose token would be rejected as expired anyway
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        self.store.purge_expired(now).await
    }
}
