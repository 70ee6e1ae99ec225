//! Authentication primitives: password hashing and signed session tokens.
//!
//! # Responsibility
//! - Hash and verify passwords and recovery tokens with Argon2.
//! - Stamp and verify HMAC-signed auth tokens in two flavors.
//!
//! # Invariants
//! - Token verification never trusts the payload before the signature checks out.
//! - Secrets never appear in error messages or logs.

pub mod password;
pub mod token;

use thiserror::Error;

pub use password::{hash_password, hash_recovery_token, verify_password, verify_recovery_token};
pub use token::{AuthToken, AuthTokenClaims, AuthTokenKind, AuthTokenStamper};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid auth token")]
    InvalidToken,
    #[error("auth token expired")]
    ExpiredToken,
    #[error("invalid credentials")]
    BadCredentials,
    #[error("hashing failed: {0}")]
    Hashing(String),
}

pub type AuthResult<T> = Result<T, AuthError>;
