//! Credential verification and session tokens.
//!
//! Passwords are stored as Argon2id PHC strings with a per-password random
//! salt. Only PHC-formatted hashes verify; anything else (including legacy
//! `salt:sha256` pairs) fails closed.
//!
//! Sessions are HS256 JWTs carrying the username, display name, and role
//! set. The signing secret comes from `SESSION_SECRET`; a fixed development
//! secret is used when unset so local setups work out of the box.

use anyhow::{anyhow, Result};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::roles::RoleSet;

/// Session lifetime in seconds (24 hours).
pub const SESSION_TTL_SECS: i64 = 24 * 3600;

/// Resolve the session signing secret from the environment.
pub fn session_secret() -> String {
    std::env::var("SESSION_SECRET").unwrap_or_else(|_| "welcomehome-dev-secret".to_string())
}

/// Hash a plaintext password into an Argon2id PHC string.
pub fn hash_password(plain: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| anyhow!("password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

/// Verify a plaintext password against a stored PHC string.
///
/// Returns false for malformed stored hashes as well as mismatches, so the
/// caller produces the same generic failure either way.
pub fn verify_password(plain: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Username of the authenticated account.
    pub sub: String,
    /// Display name ("fname lname").
    pub name: String,
    /// Roles held by the account at login time.
    pub roles: RoleSet,
    /// Expiry, unix seconds.
    pub exp: i64,
}

/// Issue a session token for an authenticated account.
pub fn issue_token(secret: &str, username: &str, name: &str, roles: RoleSet) -> Result<String> {
    let claims = SessionClaims {
        sub: username.to_string(),
        name: name.to_string(),
        roles,
        exp: chrono::Utc::now().timestamp() + SESSION_TTL_SECS,
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

/// Decode and verify a session token.
pub fn decode_token(secret: &str, token: &str) -> Result<SessionClaims> {
    let validation = Validation::new(Algorithm::HS256);
    let data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}
