//! HMAC-SHA256 signed auth tokens.
//!
//! A token is `base64url(claims_json) "." base64url(signature)`.

use crate::auth::{AuthError, AuthResult};
use crate::model::framework::{EntityId, Timestamp};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt::{Debug, Formatter};

type HmacSha256 = Hmac<Sha256>;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;
/// Progress-reporter tokens are handed to a live UI channel only.
const PROGRESS_REPORTER_TTL_SECONDS: i64 = 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthTokenKind {
    General,
    ProgressReporter,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthTokenClaims {
    pub kind: AuthTokenKind,
    pub user_ref_id: EntityId,
    pub issued_at: Timestamp,
    pub expires_at: Timestamp,
}

/// Opaque signed token.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Debug for AuthToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthToken(****)")
    }
}

/// Process-wide token signer.
#[derive(Clone)]
pub struct AuthTokenStamper {
    secret: Vec<u8>,
    general_ttl_seconds: i64,
}

impl AuthTokenStamper {
    pub fn new(secret: &str, ttl_days: u32) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            general_ttl_seconds: i64::from(ttl_days) * SECONDS_PER_DAY,
        }
    }

    fn mac(&self) -> AuthResult<HmacSha256> {
        HmacSha256::new_from_slice(&self.secret).map_err(|err| AuthError::Hashing(err.to_string()))
    }

    pub fn stamp(&self, kind: AuthTokenKind, user_ref_id: EntityId, now: Timestamp) -> AuthResult<AuthToken> {
        let ttl = match kind {
            AuthTokenKind::General => self.general_ttl_seconds,
            AuthTokenKind::ProgressReporter => PROGRESS_REPORTER_TTL_SECONDS,
        };
        let claims = AuthTokenClaims {
            kind,
            user_ref_id,
            issued_at: now,
            expires_at: now.plus_seconds(ttl),
        };
        let payload = serde_json::to_vec(&claims).map_err(|err| AuthError::Hashing(err.to_string()))?;
        let payload = URL_SAFE_NO_PAD.encode(payload);
        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        Ok(AuthToken(format!("{payload}.{signature}")))
    }

    /// Checks signature, flavor and expiry, in that order.
    pub fn verify(&self, token: &AuthToken, expected: AuthTokenKind, now: Timestamp) -> AuthResult<AuthTokenClaims> {
        let (payload, signature) = token.as_str().split_once('.').ok_or(AuthError::InvalidToken)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| AuthError::InvalidToken)?;
        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature).map_err(|_| AuthError::InvalidToken)?;
        let payload = URL_SAFE_NO_PAD.decode(payload).map_err(|_| AuthError::InvalidToken)?;
        let claims: AuthTokenClaims = serde_json::from_slice(&payload).map_err(|_| AuthError::InvalidToken)?;
        if claims.kind != expected {
            return Err(AuthError::InvalidToken);
        }
        if claims.expires_at <= now {
            return Err(AuthError::ExpiredToken);
        }
        Ok(claims)
    }
}

impl Debug for AuthTokenStamper {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthTokenStamper")
            .field("general_ttl_seconds", &self.general_ttl_seconds)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::{AuthToken, AuthTokenKind, AuthTokenStamper};
    use crate::auth::AuthError;
    use crate::model::framework::{EntityId, Timestamp};

    fn at(raw: &str) -> Timestamp {
        raw.parse().expect("timestamp")
    }

    #[test]
    fn tokens_verify_until_they_expire() {
        let stamper = AuthTokenStamper::new("test-secret-test-secret-test-secret", 30);
        let now = at("2024-03-04T09:00:00Z");
        let token = stamper
            .stamp(AuthTokenKind::General, EntityId::from_raw(7), now)
            .expect("stamp");
        let claims = stamper
            .verify(&token, AuthTokenKind::General, at("2024-03-20T09:00:00Z"))
            .expect("verify");
        assert_eq!(claims.user_ref_id, EntityId::from_raw(7));
        assert_eq!(
            stamper.verify(&token, AuthTokenKind::General, at("2024-04-04T09:00:00Z")),
            Err(AuthError::ExpiredToken)
        );
        assert_eq!(
            stamper.verify(&token, AuthTokenKind::ProgressReporter, now),
            Err(AuthError::InvalidToken)
        );
    }

    #[test]
    fn tampered_or_foreign_tokens_are_rejected() {
        let stamper = AuthTokenStamper::new("test-secret-test-secret-test-secret", 30);
        let other = AuthTokenStamper::new("another-secret-another-secret-xx", 30);
        let now = at("2024-03-04T09:00:00Z");
        let token = stamper
            .stamp(AuthTokenKind::ProgressReporter, EntityId::from_raw(7), now)
            .expect("stamp");
        assert_eq!(
            other.verify(&token, AuthTokenKind::ProgressReporter, now),
            Err(AuthError::InvalidToken)
        );
        let forged = AuthToken::from_raw(token.as_str().replacen('e', "f", 1));
        assert!(stamper.verify(&forged, AuthTokenKind::ProgressReporter, now).is_err());
        assert_eq!(
            stamper.verify(&AuthToken::from_raw("garbage"), AuthTokenKind::General, now),
            Err(AuthError::InvalidToken)
        );
        assert!(!format!("{token:?}").contains(token.as_str()));
    }
}
