//! Realm codecs.
//!
//! # Responsibility
//! - Name the representation contexts a domain value can travel through.
//! - Encode/decode values per realm, enforcing per-type realm restrictions.
//!
//! # Invariants
//! - Encoders are total on valid domain values.
//! - Decoders reject malformed input with `InputValidationError`.
//! - Secret values never expose their contents in `Search` or `EventStore`.
//! - The registry refuses types it does not know and realms a type excludes.

use crate::model::framework::errors::InputValidationError;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Tree of primitives, lists and string-keyed maps.
pub type RealmThing = serde_json::Value;

/// Placeholder emitted instead of secret contents.
pub const REDACTED: &str = "******";

/// Representation context of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Realm {
    Database,
    Search,
    Web,
    Cli,
    EventStore,
    Email,
}

pub const ALL_REALMS: &[Realm] = &[
    Realm::Database,
    Realm::Search,
    Realm::Web,
    Realm::Cli,
    Realm::EventStore,
    Realm::Email,
];

impl Realm {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::Search => "search",
            Self::Web => "web",
            Self::Cli => "cli",
            Self::EventStore => "event_store",
            Self::Email => "email",
        }
    }
}

impl Display for Realm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A domain value with a representation in one or more realms.
pub trait RealmValue: Sized + 'static {
    /// Stable registry name.
    const TYPE_NAME: &'static str;

    fn allowed_realms() -> &'static [Realm] {
        ALL_REALMS
    }

    fn to_realm(&self, realm: Realm) -> RealmThing;

    fn from_realm(thing: &RealmThing, realm: Realm) -> Result<Self, InputValidationError>;
}

/// Secret values expose their contents only through this accessor.
pub trait SecretValue {
    fn reveal(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RealmCodecError {
    #[error("value type `{0}` is not registered with the realm codec registry")]
    UnknownType(String),
    #[error("value type `{type_name}` cannot be used in the {realm} realm")]
    RealmNotAllowed {
        type_name: &'static str,
        realm: Realm,
    },
    #[error("value type `{type_name}` is registered twice")]
    DuplicateType { type_name: &'static str },
    #[error(transparent)]
    Validation(#[from] InputValidationError),
}

type Validator = fn(&RealmThing, Realm) -> Result<(), InputValidationError>;

#[derive(Debug, Clone, Copy)]
struct CodecEntry {
    realms: &'static [Realm],
    validate: Validator,
}

fn validate_as<T: RealmValue>(thing: &RealmThing, realm: Realm) -> Result<(), InputValidationError> {
    T::from_realm(thing, realm).map(|_| ())
}

/// Catalog of value types and the realms each may appear in.
///
/// Built once at start-up by the composition root and shared read-only.
#[derive(Debug, Default)]
pub struct RealmCodecRegistry {
    entries: BTreeMap<&'static str, CodecEntry>,
}

impl RealmCodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: RealmValue>(&mut self) -> Result<(), RealmCodecError> {
        if self.entries.contains_key(T::TYPE_NAME) {
            return Err(RealmCodecError::DuplicateType {
                type_name: T::TYPE_NAME,
            });
        }
        self.entries.insert(
            T::TYPE_NAME,
            CodecEntry {
                realms: T::allowed_realms(),
                validate: validate_as::<T>,
            },
        );
        Ok(())
    }

    pub fn is_registered(&self, type_name: &str) -> bool {
        self.entries.contains_key(type_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn type_names(&self) -> Vec<&'static str> {
        self.entries.keys().copied().collect()
    }

    /// Encodes `value` into `realm` after checking registration and realm rules.
    pub fn encode<T: RealmValue>(
        &self,
        value: &T,
        realm: Realm,
    ) -> Result<RealmThing, RealmCodecError> {
        self.check::<T>(realm)?;
        Ok(value.to_realm(realm))
    }

    /// Decodes a `T` from `realm` after checking registration and realm rules.
    pub fn decode<T: RealmValue>(
        &self,
        thing: &RealmThing,
        realm: Realm,
    ) -> Result<T, RealmCodecError> {
        self.check::<T>(realm)?;
        Ok(T::from_realm(thing, realm)?)
    }

    /// Validates a raw thing against a type known only by name.
    pub fn validate(
        &self,
        type_name: &str,
        thing: &RealmThing,
        realm: Realm,
    ) -> Result<(), RealmCodecError> {
        let (registered_name, entry) = self
            .entries
            .get_key_value(type_name)
            .ok_or_else(|| RealmCodecError::UnknownType(type_name.to_string()))?;
        let registered_name: &'static str = *registered_name;
        if !entry.realms.contains(&realm) {
            return Err(RealmCodecError::RealmNotAllowed {
                type_name: registered_name,
                realm,
            });
        }
        (entry.validate)(thing, realm)?;
        Ok(())
    }

    fn check<T: RealmValue>(&self, realm: Realm) -> Result<(), RealmCodecError> {
        let entry = self
            .entries
            .get(T::TYPE_NAME)
            .ok_or_else(|| RealmCodecError::UnknownType(T::TYPE_NAME.to_string()))?;
        if !entry.realms.contains(&realm) {
            return Err(RealmCodecError::RealmNotAllowed {
                type_name: T::TYPE_NAME,
                realm,
            });
        }
        Ok(())
    }
}

/// Implements `RealmValue` for a type with `Display` + `FromStr<Err = InputValidationError>`.
macro_rules! string_realm_value {
    ($ty:ty, $name:literal) => {
        $crate::model::framework::realm::string_realm_value!(
            $ty,
            $name,
            $crate::model::framework::realm::ALL_REALMS
        );
    };
    ($ty:ty, $name:literal, $realms:expr) => {
        impl $crate::model::framework::realm::RealmValue for $ty {
            const TYPE_NAME: &'static str = $name;

            fn allowed_realms() -> &'static [$crate::model::framework::realm::Realm] {
                $realms
            }

            fn to_realm(
                &self,
                _realm: $crate::model::framework::realm::Realm,
            ) -> $crate::model::framework::realm::RealmThing {
                $crate::model::framework::realm::RealmThing::String(self.to_string())
            }

            fn from_realm(
                thing: &$crate::model::framework::realm::RealmThing,
                _realm: $crate::model::framework::realm::Realm,
            ) -> Result<Self, $crate::model::framework::errors::InputValidationError> {
                match thing {
                    $crate::model::framework::realm::RealmThing::String(raw) => {
                        raw.parse::<$ty>()
                    }
                    other => Err($crate::model::framework::errors::InputValidationError::new(
                        format!("expected a string for {}, got `{}`", $name, other),
                    )),
                }
            }
        }
    };
}

/// Implements `RealmValue` for a secret: redacted in `Search` and `EventStore`.
macro_rules! secret_realm_value {
    ($ty:ty, $name:literal, $realms:expr) => {
        impl $crate::model::framework::realm::RealmValue for $ty {
            const TYPE_NAME: &'static str = $name;

            fn allowed_realms() -> &'static [$crate::model::framework::realm::Realm] {
                $realms
            }

            fn to_realm(
                &self,
                realm: $crate::model::framework::realm::Realm,
            ) -> $crate::model::framework::realm::RealmThing {
                use $crate::model::framework::realm::{Realm, RealmThing, SecretValue, REDACTED};
                match realm {
                    Realm::Search | Realm::EventStore => RealmThing::String(REDACTED.to_string()),
                    _ => RealmThing::String(self.reveal().to_string()),
                }
            }

            fn from_realm(
                thing: &$crate::model::framework::realm::RealmThing,
                realm: $crate::model::framework::realm::Realm,
            ) -> Result<Self, $crate::model::framework::errors::InputValidationError> {
                use $crate::model::framework::errors::InputValidationError;
                use $crate::model::framework::realm::{Realm, RealmThing};
                if matches!(realm, Realm::Search | Realm::EventStore) {
                    return Err(InputValidationError::new(format!(
                        "{} cannot be decoded from the {} realm",
                        $name, realm
                    )));
                }
                match thing {
                    RealmThing::String(raw) => raw.parse::<$ty>(),
                    other => Err(InputValidationError::new(format!(
                        "expected a string for {}, got `{}`",
                        $name, other
                    ))),
                }
            }
        }
    };
}

/// Implements `RealmValue` for a composite value through its serde shape.
macro_rules! serde_realm_value {
    ($ty:ty, $name:literal) => {
        impl $crate::model::framework::realm::RealmValue for $ty {
            const TYPE_NAME: &'static str = $name;

            fn to_realm(
                &self,
                _realm: $crate::model::framework::realm::Realm,
            ) -> $crate::model::framework::realm::RealmThing {
                serde_json::to_value(self)
                    .unwrap_or($crate::model::framework::realm::RealmThing::Null)
            }

            fn from_realm(
                thing: &$crate::model::framework::realm::RealmThing,
                _realm: $crate::model::framework::realm::Realm,
            ) -> Result<Self, $crate::model::framework::errors::InputValidationError> {
                serde_json::from_value(thing.clone()).map_err(|err| {
                    $crate::model::framework::errors::InputValidationError::new(format!(
                        "invalid {}: {}",
                        $name, err
                    ))
                })
            }
        }
    };
}

pub(crate) use secret_realm_value;
pub(crate) use serde_realm_value;
pub(crate) use string_realm_value;

impl RealmValue for String {
    const TYPE_NAME: &'static str = "str";

    fn to_realm(&self, _realm: Realm) -> RealmThing {
        RealmThing::String(self.clone())
    }

    fn from_realm(thing: &RealmThing, _realm: Realm) -> Result<Self, InputValidationError> {
        match thing {
            RealmThing::String(raw) => Ok(raw.clone()),
            other => Err(InputValidationError::new(format!(
                "expected a string, got `{other}`"
            ))),
        }
    }
}

impl RealmValue for bool {
    const TYPE_NAME: &'static str = "bool";

    fn to_realm(&self, _realm: Realm) -> RealmThing {
        RealmThing::Bool(*self)
    }

    fn from_realm(thing: &RealmThing, _realm: Realm) -> Result<Self, InputValidationError> {
        thing
            .as_bool()
            .ok_or_else(|| InputValidationError::new(format!("expected a boolean, got `{thing}`")))
    }
}

impl RealmValue for i64 {
    const TYPE_NAME: &'static str = "int";

    fn to_realm(&self, _realm: Realm) -> RealmThing {
        RealmThing::from(*self)
    }

    fn from_realm(thing: &RealmThing, _realm: Realm) -> Result<Self, InputValidationError> {
        thing
            .as_i64()
            .ok_or_else(|| InputValidationError::new(format!("expected an integer, got `{thing}`")))
    }
}

impl RealmValue for u32 {
    const TYPE_NAME: &'static str = "uint";

    fn to_realm(&self, _realm: Realm) -> RealmThing {
        RealmThing::from(*self)
    }

    fn from_realm(thing: &RealmThing, _realm: Realm) -> Result<Self, InputValidationError> {
        thing
            .as_u64()
            .and_then(|value| u32::try_from(value).ok())
            .ok_or_else(|| {
                InputValidationError::new(format!("expected a non-negative integer, got `{thing}`"))
            })
    }
}

impl RealmValue for f64 {
    const TYPE_NAME: &'static str = "float";

    fn to_realm(&self, _realm: Realm) -> RealmThing {
        serde_json::Number::from_f64(*self)
            .map(RealmThing::Number)
            .unwrap_or(RealmThing::Null)
    }

    fn from_realm(thing: &RealmThing, _realm: Realm) -> Result<Self, InputValidationError> {
        thing
            .as_f64()
            .ok_or_else(|| InputValidationError::new(format!("expected a number, got `{thing}`")))
    }
}

#[cfg(test)]
mod tests {
    use super::{Realm, RealmCodecError, RealmCodecRegistry, RealmThing, RealmValue};

    #[test]
    fn registry_rejects_unknown_types() {
        let registry = RealmCodecRegistry::new();
        let err = registry
            .encode(&true, Realm::Database)
            .expect_err("unregistered type must fail");
        assert_eq!(err, RealmCodecError::UnknownType("bool".to_string()));
    }

    #[test]
    fn registry_rejects_duplicates() {
        let mut registry = RealmCodecRegistry::new();
        registry.register::<bool>().expect("first registration");
        let err = registry
            .register::<bool>()
            .expect_err("duplicate registration must fail");
        assert!(matches!(err, RealmCodecError::DuplicateType { .. }));
    }

    #[test]
    fn primitives_roundtrip_in_every_realm() {
        let mut registry = RealmCodecRegistry::new();
        registry.register::<i64>().expect("register int");
        for realm in super::ALL_REALMS {
            let encoded = registry.encode(&42_i64, *realm).expect("encode");
            let decoded: i64 = registry.decode(&encoded, *realm).expect("decode");
            assert_eq!(decoded, 42);
        }
    }

    #[test]
    fn validate_by_name_reports_decode_failures() {
        let mut registry = RealmCodecRegistry::new();
        registry.register::<u32>().expect("register uint");
        let err = registry
            .validate("uint", &RealmThing::from(-3), Realm::Web)
            .expect_err("negative value must fail");
        assert!(matches!(err, RealmCodecError::Validation(_)));
        assert_eq!(u32::TYPE_NAME, "uint");
    }
}
