//! Secret values: passwords, recovery tokens and their hashes.
//!
//! # Invariants
//! - Plain secrets serialize as a redacted token; they are never persisted.
//! - All secrets encode as a redacted token in the `Search` and `EventStore` realms.
//! - Plain passwords are only accepted in the `Cli`, `Web` and `EventStore` realms.

use crate::model::framework::errors::InputValidationError;
use crate::model::framework::realm::{secret_realm_value, Realm, SecretValue, ALL_REALMS, REDACTED};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt::{Debug, Formatter};
use std::str::FromStr;

const PASSWORD_REALMS: &[Realm] = &[Realm::Cli, Realm::Web, Realm::EventStore];

fn validate_password(raw: &str) -> Result<String, InputValidationError> {
    if raw.chars().any(char::is_whitespace) {
        return Err(InputValidationError::new("password must not contain whitespace"));
    }
    if raw.chars().count() < PasswordPlain::MIN_LENGTH {
        return Err(InputValidationError::new(format!(
            "password must be at least {} characters long",
            PasswordPlain::MIN_LENGTH
        )));
    }
    Ok(raw.to_string())
}

macro_rules! secret_type {
    ($name:ident, $redacted_serde:literal, $validate:expr) => {
        #[derive(Clone, PartialEq, Eq, Deserialize)]
        #[serde(try_from = "String")]
        pub struct $name(String);

        impl Debug for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), REDACTED)
            }
        }

        impl SecretValue for $name {
            fn reveal(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = InputValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let validate: fn(&str) -> Result<String, InputValidationError> = $validate;
                validate(s).map(Self)
            }
        }

        impl TryFrom<String> for $name {
            type Error = InputValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                if $redacted_serde {
                    serializer.serialize_str(REDACTED)
                } else {
                    serializer.serialize_str(&self.0)
                }
            }
        }
    };
}

secret_type!(PasswordPlain, true, validate_password);
secret_type!(PasswordNewPlain, true, validate_password);
secret_type!(RecoveryTokenPlain, true, |raw: &str| {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.len() > 256 || trimmed.chars().any(char::is_whitespace) {
        return Err(InputValidationError::new("invalid recovery token"));
    }
    Ok(trimmed.to_string())
});
secret_type!(PasswordHash, false, |raw: &str| {
    if raw.is_empty() {
        return Err(InputValidationError::new("empty password hash"));
    }
    Ok(raw.to_string())
});
secret_type!(RecoveryTokenHash, false, |raw: &str| {
    if raw.is_empty() {
        return Err(InputValidationError::new("empty recovery token hash"));
    }
    Ok(raw.to_string())
});

impl PasswordPlain {
    pub const MIN_LENGTH: usize = 10;
}

impl PasswordNewPlain {
    pub fn as_plain(&self) -> PasswordPlain {
        PasswordPlain(self.0.clone())
    }
}

impl RecoveryTokenPlain {
    /// Fresh random recovery token.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }
}

impl PasswordHash {
    pub fn from_hashed(hashed: String) -> Self {
        Self(hashed)
    }
}

impl RecoveryTokenHash {
    pub fn from_hashed(hashed: String) -> Self {
        Self(hashed)
    }
}

secret_realm_value!(PasswordPlain, "password_plain", PASSWORD_REALMS);
secret_realm_value!(PasswordNewPlain, "password_new_plain", PASSWORD_REALMS);
secret_realm_value!(RecoveryTokenPlain, "recovery_token_plain", ALL_REALMS);
secret_realm_value!(PasswordHash, "password_hash", ALL_REALMS);
secret_realm_value!(RecoveryTokenHash, "recovery_token_hash", ALL_REALMS);

#[cfg(test)]
mod tests {
    use super::{PasswordHash, PasswordPlain, RecoveryTokenPlain};
    use crate::model::framework::realm::{Realm, RealmThing, RealmValue, SecretValue, REDACTED};

    #[test]
    fn password_rules() {
        assert!("LongEnough1".parse::<PasswordPlain>().is_ok());
        assert!("short".parse::<PasswordPlain>().is_err());
        assert!("has a space in it".parse::<PasswordPlain>().is_err());
    }

    #[test]
    fn secrets_are_redacted_in_event_store_and_search() {
        let password: PasswordPlain = "LongEnough1".parse().expect("valid");
        assert_eq!(
            password.to_realm(Realm::EventStore),
            RealmThing::String(REDACTED.to_string())
        );
        assert_eq!(
            password.to_realm(Realm::Web),
            RealmThing::String("LongEnough1".to_string())
        );
        assert!(PasswordPlain::from_realm(&RealmThing::String("x".repeat(12)), Realm::EventStore).is_err());
    }

    #[test]
    fn plain_secrets_never_serialize_their_contents() {
        let token: RecoveryTokenPlain = "RT1".parse().expect("valid token");
        assert_eq!(serde_json::to_string(&token).expect("serialize"), format!("\"{REDACTED}\""));
        assert_eq!(token.reveal(), "RT1");
        let hash = PasswordHash::from_hashed("$argon2id$abc".to_string());
        assert_eq!(serde_json::to_string(&hash).expect("serialize"), "\"$argon2id$abc\"");
        assert!(format!("{hash:?}").contains(REDACTED));
    }
}
