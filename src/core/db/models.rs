//! Database models for usergate
//!
//! This module defines the persisted record types that map to PostgreSQL tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ============================================================================
// User Model
// ============================================================================

/// User entity representing a registered account
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_deleted: bool,
}

impl User {
    /// Build a fresh, not-yet-persisted account
    pub fn new(name: impl Into<String>, email: impl Into<String>, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            password_hash,
            created_at: now,
            updated_at: now,
            is_deleted: false,
        }
    }

    /// Subject identifier carried in session tokens
    pub fn subject(&self) -> String {
        self.id.to_string()
    }
}

/// User without sensitive data (for API responses)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

// ============================================================================
// Revoked Token Model
// ============================================================================

/// A logged-out session token.
///
/// Only the SHA-256 digest of the bearer value is stored. `expires_at` is
/// copied from the token's own `exp` claim so the record can be swept once
/// the token would have expired anyway.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct RevokedToken {
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: DateTime<Utc>,
}

// ============================================================================
// Password Reset Ticket Model
// ============================================================================

/// Single-use, time-boxed password reset ticket
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ResetTicket {
    pub id: Uuid,
    pub user_id: Uuid,
    pub secret_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
}

impl ResetTicket {
    /// Create a fresh ticket valid from `now` until `now + ttl`, capped at
    /// the latest representable instant
    pub fn issue(
        user_id: Uuid,
        secret_hash: String,
        now: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            secret_hash,
            created_at: now,
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
            used: false,
        }
    }

    /// A ticket can be redeemed only while unused and strictly before expiry
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        !self.used && self.expires_at > now
    }
}
