//! Session token codec
//!
//! Issues and verifies HS256-signed JWTs carrying the account id (`sub`), the
//! account e-mail as an auxiliary claim, issue and expiry instants. The codec
//! is stateless: a pure function of the shared secret and the wall clock.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::config::{Config, DEFAULT_JWT_ISSUER, DEFAULT_TOKEN_DURATION_MINUTES};

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret key for signing tokens
    pub secret: String,
    /// Session token lifetime in minutes
    pub token_duration_minutes: i64,
    /// Token issuer
    pub issuer: String,
}

impl JwtConfig {
    /// Create a new JWT configuration with default lifetime and issuer
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            token_duration_minutes: DEFAULT_TOKEN_DURATION_MINUTES,
            issuer: DEFAULT_JWT_ISSUER.to_string(),
        }
    }

    /// Build from process configuration; the secret is mandatory
    pub fn from_config(config: &Config) -> Result<Self, TokenError> {
        let secret = config
            .jwt_secret
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or(TokenError::MissingSecret)?;

        Ok(Self {
            secret,
            token_duration_minutes: config.token_duration_minutes,
            issuer: config.jwt_issuer.clone(),
        })
    }

    /// Set token lifetime
    pub fn token_duration(mut self, minutes: i64) -> Self {
        self.token_duration_minutes = minutes;
        self
    }

    /// Set issuer
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }
}

/// Token codec errors
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("JWT_SECRET environment variable not set")]
    MissingSecret,

    #[error("Token encoding failed: {0}")]
    Encoding(String),

    #[error("Malformed token")]
    Malformed,

    #[error("Bad token signature")]
    BadSignature,

    #[error("Token expired")]
    Expired,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::BadSignature,
            _ => TokenError::Malformed,
        }
    }
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (account id)
    pub sub: String,
    /// Account e-mail
    pub email: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issuer
    pub iss: String,
    /// Unique token id, keeps two tokens issued in the same second distinct
    pub jti: String,
}

impl Claims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// A freshly issued session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// JWT service for token operations
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    /// Create a new JWT service
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Configured token lifetime, if it fits in a `Duration`
    pub fn token_duration(&self) -> Option<Duration> {
        Duration::try_minutes(self.config.token_duration_minutes)
    }

    /// Issue a session token with the configured lifetime
    pub fn issue(&self, subject: &str, email: &str) -> Result<IssuedToken, TokenError> {
        let ttl = self
            .token_duration()
            .ok_or_else(|| TokenError::Encoding("token lifetime out of range".to_string()))?;
        self.issue_with_ttl(subject, email, ttl)
    }

    /// Issue a session token valid for `ttl` from now
    pub fn issue_with_ttl(
        &self,
        subject: &str,
        email: &str,
        ttl: Duration,
    ) -> Result<IssuedToken, TokenError> {
        let now = Utc::now();
        let exp = now
            .checked_add_signed(ttl)
            .ok_or_else(|| TokenError::Encoding("token expiry out of range".to_string()))?;

        let claims = Claims {
            sub: subject.to_string(),
            email: email.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.config.issuer.clone(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;

        Ok(IssuedToken {
            token,
            expires_at: claims.expires_at(),
        })
    }

    /// Validate and decode a token.
    ///
    /// Only HS256 is accepted; any other `alg` header fails as a bad
    /// signature. Expiry is checked by the library with zero leeway.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);
        validation.leeway = 0;

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)?;

        Ok(token_data.claims)
    }
}
