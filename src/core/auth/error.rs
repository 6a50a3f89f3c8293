//! Error taxonomy for the credential core
//!
//! Every failure surfaced to the transport is an [`AuthError`]. Each variant
//! maps onto one coarse [`ErrorKind`]; the transport renders the kind as its
//! own status code and never reinterprets the meaning.

use std::fmt;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::core::db::repositories::StoreError;

/// Externally visible failure categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    Unauthenticated,
    PermissionDenied,
    NotFound,
    AlreadyExists,
    ResourceExhausted,
    Internal,
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::AlreadyExists => StatusCode::CONFLICT,
            ErrorKind::ResourceExhausted => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "INVALID_ARGUMENT",
            ErrorKind::Unauthenticated => "UNAUTHENTICATED",
            ErrorKind::PermissionDenied => "PERMISSION_DENIED",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::AlreadyExists => "ALREADY_EXISTS",
            ErrorKind::ResourceExhausted => "RESOURCE_EXHAUSTED",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

/// Why the session gate rejected a call.
///
/// All reasons surface as [`ErrorKind::Unauthenticated`]. `InvalidToken`
/// covers malformed, forged, wrong-algorithm and expired tokens alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnauthenticatedReason {
    NoMetadata,
    MissingToken,
    BadFormat,
    Revoked,
    InvalidToken,
}

impl fmt::Display for UnauthenticatedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            UnauthenticatedReason::NoMetadata => "metadata is not provided",
            UnauthenticatedReason::MissingToken => "authorization token is not provided",
            UnauthenticatedReason::BadFormat => "invalid token format",
            UnauthenticatedReason::Revoked => "token has been revoked",
            UnauthenticatedReason::InvalidToken => "invalid token",
        };
        f.write_str(message)
    }
}

/// Credential core error types
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Unauthenticated(UnauthenticatedReason),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("permission denied")]
    PermissionDenied,

    #[error("rate limit exceeded")]
    ResourceExhausted,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("invalid or expired token")]
    InvalidOrExpiredTicket,

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        AuthError::InvalidArgument(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        AuthError::Internal(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::InvalidArgument(_) | AuthError::InvalidOrExpiredTicket => {
                ErrorKind::InvalidArgument
            }
            AuthError::Unauthenticated(_) | AuthError::InvalidCredentials => {
                ErrorKind::Unauthenticated
            }
            AuthError::PermissionDenied => ErrorKind::PermissionDenied,
            AuthError::ResourceExhausted => ErrorKind::ResourceExhausted,
            AuthError::NotFound(_) => ErrorKind::NotFound,
            AuthError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            AuthError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Message safe to hand to callers. Internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(what) => AuthError::AlreadyExists(what),
            other => AuthError::Internal(other.to_string()),
        }
    }
}

/// Malformed or mistyped request bodies are the caller's fault
impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        AuthError::InvalidArgument(rejection.body_text())
    }
}

/// API error response body
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        if let AuthError::Internal(detail) = &self {
            tracing::error!("Internal error: {}", detail);
        }

        let body = ApiError::new(self.public_message(), kind.code());
        (kind.status(), Json(body)).into_response()
    }
}
