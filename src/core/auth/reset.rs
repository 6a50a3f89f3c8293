//! Password reset flow
//!
//! A reset ticket is a 256-bit random secret bound to one account. It moves
//! from `Issued` to `Consumed` exactly once, and only before it expires.
//! Every failed completion looks the same to the caller, and starting a reset
//! for an unknown address looks the same as for a known one.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::{RngCore, rngs::OsRng};

use super::error::AuthError;
use super::password::{hash_password, validate_password};
use crate::core::config::Config;
use crate::core::db::models::{ResetTicket, User};
use crate::core::db::repositories::{ResetTicketStore, UserStore, hash_token};

/// Bytes of randomness in a reset secret
pub const RESET_SECRET_BYTES: usize = 32;

/// Out-of-band delivery failure
#[derive(Debug, thiserror::Error)]
#[error("reset delivery failed: {0}")]
pub struct DeliveryError(pub String);

/// Hands a freshly issued reset secret to the account owner
#[async_trait]
pub trait ResetNotifier: Send + Sync {
    async fn deliver(&self, email: &str, secret: &str) -> Result<(), DeliveryError>;
}

/// Development stand-in for e-mail delivery: writes the secret to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogResetNotifier;

#[async_trait]
impl ResetNotifier for LogResetNotifier {
    async fn deliver(&self, email: &str, secret: &str) -> Result<(), DeliveryError> {
        tracing::info!(email = %email, "Password reset token issued: {}", secret);
        Ok(())
    }
}

/// Hex-encoded 256-bit secret from the OS RNG
pub fn generate_reset_secret() -> String {
    let mut bytes = [0u8; RESET_SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[derive(Clone)]
pub struct PasswordResetService {
    users: Arc<dyn UserStore>,
    tickets: Arc<dyn ResetTicketStore>,
    notifier: Arc<dyn ResetNotifier>,
    ticket_ttl: Duration,
    bcrypt_cost: u32,
}

impl PasswordResetService {
    pub fn new(
        users: Arc<dyn UserStore>,
        tickets: Arc<dyn ResetTicketStore>,
        notifier: Arc<dyn ResetNotifier>,
        config: &Config,
    ) -> Self {
        Self {
            users,
            tickets,
            notifier,
            ticket_ttl: config.reset_token_ttl(),
            bcrypt_cost: config.bcrypt_cost,
        }
    }

    /// Start a reset for `email`.
    ///
    /// Returns `Ok(())` whether or not an active account exists, right after
    /// the account lookup. For an existing account the ticket is persisted
    /// and delivered on a detached task; its failures are only logged.
    pub async fn begin_reset(&self, email: &str) -> Result<(), AuthError> {
        if email.is_empty() {
            return Err(AuthError::invalid_argument("email is required"));
        }

        let Some(user) = self.users.find_active_by_email(email).await? else {
            tracing::debug!("Password reset requested for unknown address");
            return Ok(());
        };

        let tickets = Arc::clone(&self.tickets);
        let notifier = Arc::clone(&self.notifier);
        let ttl = self.ticket_ttl;
        tokio::spawn(async move {
            issue_ticket(tickets.as_ref(), notifier.as_ref(), &user, ttl).await;
        });

        Ok(())
    }

    /// Redeem a reset secret and replace the account's password.
    ///
    /// The ticket is consumed before the new hash is written. If the write
    /// then fails the ticket stays consumed and the owner has to request a
    /// new one; a secret can never complete twice.
    pub async fn complete_reset(&self, secret: &str, new_password: &str) -> Result<(), AuthError> {
        validate_password(new_password)?;

        if secret.is_empty() {
            return Err(AuthError::InvalidOrExpiredTicket);
        }

        let secret_hash = hash_token(secret);
        if self
            .tickets
            .find_live(&secret_hash, Utc::now())
            .await?
            .is_none()
        {
            return Err(AuthError::InvalidOrExpiredTicket);
        }

        let password_hash = hash_password(new_password, self.bcrypt_cost).await?;

        let ticket = self
            .tickets
            .consume(&secret_hash, Utc::now())
            .await?
            .ok_or(AuthError::InvalidOrExpiredTicket)?;

        let matched = self
            .users
            .update_password_hash(ticket.user_id, &password_hash, Utc::now())
            .await?;
        if matched == 0 {
            tracing::warn!(user_id = %ticket.user_id, "Reset ticket owner no longer exists");
            return Err(AuthError::InvalidOrExpiredTicket);
        }

        tracing::info!(user_id = %ticket.user_id, "Password reset completed");
        Ok(())
    }
}

/// Persist a fresh ticket for `user` and hand the secret to the notifier
async fn issue_ticket(
    tickets: &dyn ResetTicketStore,
    notifier: &dyn ResetNotifier,
    user: &User,
    ttl: Duration,
) {
    let secret = generate_reset_secret();
    let ticket = ResetTicket::issue(user.id, hash_token(&secret), Utc::now(), ttl);
    if let Err(e) = tickets.insert(ticket).await {
        tracing::error!(user_id = %user.id, "Failed to store reset ticket: {}", e);
        return;
    }

    if let Err(e) = notifier.deliver(&user.email, &secret).await {
        tracing::warn!(user_id = %user.id, "{}", e);
        return;
    }

    tracing::info!(user_id = %user.id, "Password reset ticket issued");
}
