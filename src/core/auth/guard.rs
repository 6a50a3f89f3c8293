//! Session gate for protected operations
//!
//! [`SessionGuard::authenticate`] turns inbound request metadata into the
//! authenticated subject or an [`AuthError::Unauthenticated`]. Steps run in a
//! fixed order: metadata present, authorization present, `Bearer ` prefix,
//! revocation lookup, signature and expiry check. A failed codec check is
//! reported as one reason so callers cannot tell forged from expired.

use axum::http::{HeaderMap, header::AUTHORIZATION};

use super::error::{AuthError, UnauthenticatedReason};
use super::jwt::{Claims, JwtService};
use super::revocation::RevocationList;

const BEARER_PREFIX: &str = "Bearer ";

/// Identity resolved by the session gate, passed explicitly to handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedSubject {
    /// Account id rendered as text
    pub subject: String,
    pub email: String,
}

impl From<Claims> for AuthenticatedSubject {
    fn from(claims: Claims) -> Self {
        Self {
            subject: claims.sub,
            email: claims.email,
        }
    }
}

#[derive(Clone)]
pub struct SessionGuard {
    jwt: JwtService,
    revocations: RevocationList,
}

impl SessionGuard {
    pub fn new(jwt: JwtService, revocations: RevocationList) -> Self {
        Self { jwt, revocations }
    }

    pub async fn authenticate(
        &self,
        metadata: Option<&HeaderMap>,
    ) -> Result<AuthenticatedSubject, AuthError> {
        let Some(headers) = metadata else {
            tracing::debug!("Rejected call: no request metadata");
            return Err(AuthError::Unauthenticated(UnauthenticatedReason::NoMetadata));
        };

        let token = extract_bearer_token(headers)?;

        let revoked = self.revocations.is_revoked(token).await.map_err(|e| {
            tracing::error!("Revocation lookup failed: {}", e);
            AuthError::from(e)
        })?;
        if revoked {
            tracing::debug!("Rejected call: token has been revoked");
            return Err(AuthError::Unauthenticated(UnauthenticatedReason::Revoked));
        }

        match self.jwt.verify(token) {
            Ok(claims) => Ok(claims.into()),
            Err(e) => {
                tracing::debug!("Rejected call: token verification failed: {}", e);
                Err(AuthError::Unauthenticated(UnauthenticatedReason::InvalidToken))
            }
        }
    }
}

/// Extract the bearer value from the `authorization` header.
///
/// Only the first value is considered. The prefix match is case-sensitive
/// and must be followed by at least one character.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = match headers.get(AUTHORIZATION) {
        None => {
            tracing::debug!("Rejected call: no authorization header");
            return Err(AuthError::Unauthenticated(
                UnauthenticatedReason::MissingToken,
            ));
        }
        Some(value) if value.is_empty() => {
            return Err(AuthError::Unauthenticated(
                UnauthenticatedReason::MissingToken,
            ));
        }
        Some(value) => value,
    };

    value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix(BEARER_PREFIX))
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::Unauthenticated(UnauthenticatedReason::BadFormat))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::jwt::JwtConfig;
    use crate::core::db::models::RevokedToken;
    use crate::core::db::repositories::{
        MemoryStore, RevokedTokenStore, StoreError, StoreResult,
    };
    use async_trait::async_trait;
    use axum::http::HeaderValue;
    use chrono::{DateTime, Duration, Utc};
    use std::sync::Arc;

    const SECRET: &str = "guard_test_secret";

    fn guard_with(store: Arc<dyn RevokedTokenStore>) -> (SessionGuard, JwtService) {
        let jwt = JwtService::new(JwtConfig::new(SECRET));
        let guard = SessionGuard::new(jwt.clone(), RevocationList::new(store));
        (guard, jwt)
    }

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn reason(result: Result<AuthenticatedSubject, AuthError>) -> UnauthenticatedReason {
        match result {
            Err(AuthError::Unauthenticated(reason)) => reason,
            other => panic!("Expected Unauthenticated, got: {:?}", other),
        }
    }

    // ========================================================================
    // Extraction failures
    // ========================================================================

    #[tokio::test]
    async fn test_no_metadata() {
        let (guard, _) = guard_with(Arc::new(MemoryStore::new()));

        assert_eq!(
            reason(guard.authenticate(None).await),
            UnauthenticatedReason::NoMetadata
        );
    }

    #[tokio::test]
    async fn test_no_authorization_entry() {
        let (guard, _) = guard_with(Arc::new(MemoryStore::new()));
        let headers = HeaderMap::new();

        assert_eq!(
            reason(guard.authenticate(Some(&headers)).await),
            UnauthenticatedReason::MissingToken
        );
    }

    #[tokio::test]
    async fn test_empty_authorization_value() {
        let (guard, _) = guard_with(Arc::new(MemoryStore::new()));

        assert_eq!(
            reason(guard.authenticate(Some(&headers_with(""))).await),
            UnauthenticatedReason::MissingToken
        );
    }

    #[tokio::test]
    async fn test_missing_bearer_prefix() {
        let (guard, _) = guard_with(Arc::new(MemoryStore::new()));

        assert_eq!(
            reason(guard.authenticate(Some(&headers_with("xyz"))).await),
            UnauthenticatedReason::BadFormat
        );
        assert_eq!(
            reason(guard.authenticate(Some(&headers_with("bearer abc"))).await),
            UnauthenticatedReason::BadFormat
        );
    }

    #[tokio::test]
    async fn test_prefix_with_empty_remainder() {
        let (guard, _) = guard_with(Arc::new(MemoryStore::new()));
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));

        assert_eq!(
            reason(guard.authenticate(Some(&headers)).await),
            UnauthenticatedReason::BadFormat
        );
    }

    // ========================================================================
    // Token checks
    // ========================================================================

    #[tokio::test]
    async fn test_valid_token_yields_subject() {
        let (guard, jwt) = guard_with(Arc::new(MemoryStore::new()));
        let issued = jwt.issue("account-1", "one@example.com").unwrap();

        let subject = guard
            .authenticate(Some(&headers_with(&format!("Bearer {}", issued.token))))
            .await
            .unwrap();

        assert_eq!(subject.subject, "account-1");
        assert_eq!(subject.email, "one@example.com");
    }

    #[tokio::test]
    async fn test_revoked_token_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let (guard, jwt) = guard_with(store.clone());
        let issued = jwt.issue("account-1", "one@example.com").unwrap();

        RevocationList::new(store)
            .revoke(&issued.token, issued.expires_at)
            .await
            .unwrap();

        assert_eq!(
            reason(
                guard
                    .authenticate(Some(&headers_with(&format!("Bearer {}", issued.token))))
                    .await
            ),
            UnauthenticatedReason::Revoked
        );
    }

    #[tokio::test]
    async fn test_revoked_wins_over_expired() {
        let store = Arc::new(MemoryStore::new());
        let (guard, jwt) = guard_with(store.clone());
        let issued = jwt
            .issue_with_ttl("account-1", "one@example.com", Duration::minutes(-5))
            .unwrap();

        RevocationList::new(store)
            .revoke(&issued.token, issued.expires_at)
            .await
            .unwrap();

        assert_eq!(
            reason(
                guard
                    .authenticate(Some(&headers_with(&format!("Bearer {}", issued.token))))
                    .await
            ),
            UnauthenticatedReason::Revoked
        );
    }

    #[tokio::test]
    async fn test_codec_failures_collapse() {
        let (guard, jwt) = guard_with(Arc::new(MemoryStore::new()));
        let expired = jwt
            .issue_with_ttl("account-1", "one@example.com", Duration::minutes(-1))
            .unwrap();
        let forged = JwtService::new(JwtConfig::new("other_secret"))
            .issue("account-1", "one@example.com")
            .unwrap();

        for token in [expired.token.as_str(), forged.token.as_str(), "garbage"] {
            assert_eq!(
                reason(
                    guard
                        .authenticate(Some(&headers_with(&format!("Bearer {}", token))))
                        .await
                ),
                UnauthenticatedReason::InvalidToken
            );
        }
    }

    struct FailingStore;

    #[async_trait]
    impl RevokedTokenStore for FailingStore {
        async fn find_by_token_hash(&self, _: &str) -> StoreResult<Option<RevokedToken>> {
            Err(StoreError::Unavailable("timeout".into()))
        }

        async fn insert(&self, _: RevokedToken) -> StoreResult<()> {
            Ok(())
        }

        async fn purge_expired(&self, _: DateTime<Utc>) -> StoreResult<u64> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_revocation_fault_fails_closed() {
        let (guard, jwt) = guard_with(Arc::new(FailingStore));
        let issued = jwt.issue("account-1", "one@example.com").unwrap();

        let result = guard
            .authenticate(Some(&headers_with(&format!("Bearer {}", issued.token))))
            .await;

        assert!(matches!(result, Err(AuthError::Internal(_))));
    }
}
