//! Authentication service
//!
//! Account creation, login, logout and the profile read used to demonstrate
//! the ownership check. Coordinates the user store, the token codec and the
//! revocation list.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::error::AuthError;
use super::guard::AuthenticatedSubject;
use super::jwt::{IssuedToken, JwtService};
use super::password::{
    hash_password, validate_email, validate_name, validate_password, verify_password,
};
use super::revocation::RevocationList;
use crate::core::db::models::{User, UserResponse};
use crate::core::db::repositories::UserStore;

/// Registration request data
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Login request data
#[derive(Debug, Clone, serde::Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Session issued on successful login
#[derive(Debug, Clone, serde::Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Logout request data
#[derive(Debug, Clone, serde::Deserialize)]
pub struct LogoutRequest {
    pub token: String,
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    jwt_service: JwtService,
    revocations: RevocationList,
    bcrypt_cost: u32,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(
        users: Arc<dyn UserStore>,
        jwt_service: JwtService,
        revocations: RevocationList,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            users,
            jwt_service,
            revocations,
            bcrypt_cost,
        }
    }

    /// Register a new account
    pub async fn register(&self, request: RegisterRequest) -> Result<UserResponse, AuthError> {
        validate_name(&request.name)?;
        validate_email(&request.email)?;
        validate_password(&request.password)?;

        if self.users.count_by_email(&request.email).await? > 0 {
            return Err(AuthError::AlreadyExists("email already registered".into()));
        }

        let password_hash = hash_password(&request.password, self.bcrypt_cost).await?;
        let user = User::new(request.name, request.email, password_hash);
        self.users.insert(user.clone()).await?;

        tracing::info!(user_id = %user.id, "Account created");
        Ok(user.into())
    }

    /// Check credentials and issue a session token.
    ///
    /// An unknown address and a wrong password produce the same error.
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, AuthError> {
        if request.email.is_empty() || request.password.is_empty() {
            return Err(AuthError::invalid_argument(
                "email and password are required",
            ));
        }

        let user = self
            .users
            .find_active_by_email(&request.email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(&request.password, &user.password_hash).await? {
            tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let issued = self.issue_session(&user.subject(), &user.email)?;

        tracing::info!(user_id = %user.id, "Session issued");
        Ok(LoginResponse {
            token: issued.token,
            user_id: user.id,
            expires_at: issued.expires_at,
        })
    }

    /// Issue a session token for `subject` with the configured lifetime
    pub fn issue_session(&self, subject: &str, email: &str) -> Result<IssuedToken, AuthError> {
        self.jwt_service
            .issue(subject, email)
            .map_err(|e| AuthError::internal(format!("failed to generate token: {}", e)))
    }

    /// Revoke a session token until its own expiry
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        if token.is_empty() {
            return Err(AuthError::invalid_argument("token is required"));
        }

        let claims = self
            .jwt_service
            .verify(token)
            .map_err(|_| AuthError::invalid_argument("invalid token"))?;

        self.revocations.revoke(token, claims.expires_at()).await?;

        tracing::info!(subject = %claims.sub, "Session revoked");
        Ok(())
    }

    /// Read an account profile; callers may only read their own
    pub async fn get_profile(
        &self,
        caller: &AuthenticatedSubject,
        user_id: Uuid,
    ) -> Result<UserResponse, AuthError> {
        if caller.subject != user_id.to_string() {
            return Err(AuthError::PermissionDenied);
        }

        let user = self
            .users
            .find_active_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::NotFound("user not found".into()))?;

        Ok(user.into())
    }
}
