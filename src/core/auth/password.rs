//! Credential input rules and password hashing

use super::error::AuthError;

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// At least 8 characters with at least one ASCII letter and one ASCII digit
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.is_empty() {
        return Err(AuthError::invalid_argument("password is required"));
    }

    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::invalid_argument(
            "password must be at least 8 characters",
        ));
    }

    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if !has_letter || !has_digit {
        return Err(AuthError::invalid_argument(
            "password must contain both letters and numbers",
        ));
    }

    Ok(())
}

/// Accepts `local@domain.tld` where the TLD is two or more ASCII letters
pub fn validate_email(email: &str) -> Result<(), AuthError> {
    if email.is_empty() {
        return Err(AuthError::invalid_argument("email is required"));
    }

    if !is_well_formed_email(email) {
        return Err(AuthError::invalid_argument("invalid email format"));
    }

    Ok(())
}

pub fn validate_name(name: &str) -> Result<(), AuthError> {
    if name.trim().is_empty() {
        return Err(AuthError::invalid_argument("name is required"));
    }
    Ok(())
}

fn is_well_formed_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    let local_ok = !local.is_empty()
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '%' | '+' | '-'));

    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };

    let host_ok = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-'));
    let tld_ok = tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic());

    local_ok && host_ok && tld_ok
}

/// Hash a password with bcrypt on the blocking pool
pub async fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AuthError::internal(format!("password hashing task failed: {}", e)))?
        .map_err(|e| AuthError::internal(format!("failed to hash password: {}", e)))
}

/// Compare a password against a stored bcrypt hash on the blocking pool
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let password = password.to_owned();
    let hash = hash.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AuthError::internal(format!("password check task failed: {}", e)))?
        .map_err(|e| AuthError::internal(format!("failed to verify password: {}", e)))
}
