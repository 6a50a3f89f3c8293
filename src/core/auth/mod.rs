//! Credential and session lifecycle
//!
//! This module provides:
//! - Session token issue and verification (HS256 JWT)
//! - Revocation of logged-out tokens
//! - The session gate for protected operations
//! - Sliding-window throttling of login attempts
//! - Single-use password reset tickets
//! - REST API endpoints for the operations above

pub mod api;
pub mod error;
pub mod guard;
pub mod jwt;
pub mod password;
pub mod pipeline;
pub mod reset;
pub mod retention;
pub mod revocation;
pub mod service;
pub mod throttle;

pub use api::{AppState, api_router};
pub use error::{ApiError, AuthError, ErrorKind, UnauthenticatedReason};
pub use guard::{AuthenticatedSubject, SessionGuard};
pub use jwt::{Claims, IssuedToken, JwtConfig, JwtService, TokenError};
pub use pipeline::Operation;
pub use reset::{LogResetNotifier, PasswordResetService, ResetNotifier};
pub use retention::RetentionTask;
pub use revocation::RevocationList;
pub use service::{AuthService, LoginRequest, LoginResponse, LogoutRequest, RegisterRequest};
pub use throttle::AttemptThrottle;
