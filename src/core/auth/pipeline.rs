//! Request pipeline stages
//!
//! Which operations pass through which gate, and the axum middleware that
//! applies them. Login is the only throttled operation; everything except
//! login, account creation and the two reset steps needs a session.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};

use super::error::{AuthError, UnauthenticatedReason};
use super::guard::{AuthenticatedSubject, SessionGuard};
use super::throttle::{AttemptThrottle, DEFAULT_THROTTLE_KEY};

/// Operations exposed by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Register,
    Login,
    Logout,
    BeginReset,
    CompleteReset,
    GetProfile,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::Register,
        Operation::Login,
        Operation::Logout,
        Operation::BeginReset,
        Operation::CompleteReset,
        Operation::GetProfile,
    ];

    /// Route path serving this operation
    pub fn path(self) -> &'static str {
        match self {
            Operation::Register => "/api/auth/register",
            Operation::Login => "/api/auth/login",
            Operation::Logout => "/api/auth/logout",
            Operation::BeginReset => "/api/auth/password/reset",
            Operation::CompleteReset => "/api/auth/password/reset/confirm",
            Operation::GetProfile => "/api/users/{id}",
        }
    }

    /// Whether the session gate runs before this operation
    pub fn requires_session(self) -> bool {
        !matches!(
            self,
            Operation::Register | Operation::Login | Operation::BeginReset | Operation::CompleteReset
        )
    }

    pub fn is_throttled(self) -> bool {
        matches!(self, Operation::Login)
    }
}

/// Throttle key for a request: the peer IP when known, else a shared key
pub fn throttle_key(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| DEFAULT_THROTTLE_KEY.to_string())
}

/// Middleware rejecting calls over the attempt limit
pub async fn throttle_attempts(
    State(throttle): State<Arc<AttemptThrottle>>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let key = throttle_key(&request);
    if !throttle.allow(&key) {
        tracing::warn!(
            key = %key,
            limit = throttle.limit(),
            window_secs = throttle.window().as_secs(),
            "Attempt limit reached"
        );
        return Err(AuthError::ResourceExhausted);
    }
    Ok(next.run(request).await)
}

/// Middleware running the session gate and attaching the subject
pub async fn require_session(
    State(guard): State<SessionGuard>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let subject = guard.authenticate(Some(request.headers())).await?;
    request.extensions_mut().insert(subject);
    Ok(next.run(request).await)
}

/// Extracts the subject attached by [`require_session`].
///
/// Handlers taking this argument on a route without the session stage are
/// rejected as unauthenticated.
impl<S> FromRequestParts<S> for AuthenticatedSubject
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedSubject>()
            .cloned()
            .ok_or(AuthError::Unauthenticated(UnauthenticatedReason::NoMetadata))
    }
}
