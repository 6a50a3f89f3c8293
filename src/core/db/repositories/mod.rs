//! Database repositories for usergate
//!
//! Each record family is reached through a narrow store trait so the
//! credential core never depends on a concrete backend. PostgreSQL
//! repositories are the production implementations; [`MemoryStore`] backs
//! tests and single-process development runs.
//!
//! Lookups return `Result<Option<T>, StoreError>`: `Ok(None)` is the only
//! "no such record" signal, every `Err` is a backend fault.

use sha2::{Digest, Sha256};

pub mod memory;
pub mod reset_ticket;
pub mod revoked_token;
pub mod user;

pub use memory::MemoryStore;
pub use reset_ticket::{ResetTicketRepository, ResetTicketStore};
pub use revoked_token::{RevokedTokenRepository, RevokedTokenStore};
pub use user::{UserRepository, UserStore};

/// Storage collaborator errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// A uniqueness constraint rejected the write
    #[error("Duplicate record: {0}")]
    Duplicate(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Hash a bearer value (session token or reset secret) using SHA-256.
///
/// Stores only ever see this digest; lookups hash the presented value and
/// compare digests, so matching is still by exact string.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
