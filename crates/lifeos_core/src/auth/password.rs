//! Argon2id hashing for passwords and recovery tokens.

use crate::auth::{AuthError, AuthResult};
use crate::model::framework::realm::SecretValue;
use crate::model::values::{PasswordHash, PasswordPlain, RecoveryTokenHash, RecoveryTokenPlain};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{self, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

fn hash_secret(raw: &str) -> AuthResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(raw.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AuthError::Hashing(err.to_string()))
}

fn verify_secret(raw: &str, hashed: &str) -> AuthResult<bool> {
    let parsed = password_hash::PasswordHash::new(hashed).map_err(|err| AuthError::Hashing(err.to_string()))?;
    Ok(Argon2::default().verify_password(raw.as_bytes(), &parsed).is_ok())
}

/// PHC-formatted hash with a fresh salt.
pub fn hash_password(password: &PasswordPlain) -> AuthResult<PasswordHash> {
    hash_secret(password.reveal()).map(PasswordHash::from_hashed)
}

pub fn verify_password(password: &PasswordPlain, hash: &PasswordHash) -> AuthResult<bool> {
    verify_secret(password.reveal(), hash.reveal())
}

pub fn hash_recovery_token(token: &RecoveryTokenPlain) -> AuthResult<RecoveryTokenHash> {
    hash_secret(token.reveal()).map(RecoveryTokenHash::from_hashed)
}

pub fn verify_recovery_token(token: &RecoveryTokenPlain, hash: &RecoveryTokenHash) -> AuthResult<bool> {
    verify_secret(token.reveal(), hash.reveal())
}

#[cfg(test)]
mod tests {
    use super::{hash_password, hash_recovery_token, verify_password, verify_recovery_token};
    use crate::model::framework::realm::SecretValue;
    use crate::model::values::{PasswordHash, PasswordPlain, RecoveryTokenPlain};

    #[test]
    fn password_hash_verifies_only_the_original() {
        let password: PasswordPlain = "LongEnough1".parse().expect("password");
        let hash = hash_password(&password).expect("hash");
        assert!(hash.reveal().starts_with("$argon2"));
        assert!(verify_password(&password, &hash).expect("verify"));
        let other: PasswordPlain = "Different123".parse().expect("password");
        assert!(!verify_password(&other, &hash).expect("verify"));
        assert_ne!(hash_password(&password).expect("hash"), hash);
    }

    #[test]
    fn recovery_tokens_hash_like_passwords() {
        let token = RecoveryTokenPlain::generate();
        let hash = hash_recovery_token(&token).expect("hash");
        assert!(verify_recovery_token(&token, &hash).expect("verify"));
        assert!(!verify_recovery_token(&RecoveryTokenPlain::generate(), &hash).expect("verify"));
    }

    #[test]
    fn malformed_hash_is_an_error() {
        let password: PasswordPlain = "LongEnough1".parse().expect("password");
        assert!(verify_password(&password, &PasswordHash::from_hashed("not-a-hash".into())).is_err());
    }
}
