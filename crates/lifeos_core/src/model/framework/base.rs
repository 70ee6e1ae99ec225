//! Base values shared by every entity: ids, timestamps, dates, names.
//!
//! # Invariants
//! - `EntityId::NEW` marks an entity that has not been persisted yet.
//! - `Timestamp` is always UTC; its string form is RFC 3339 with milliseconds.
//! - `ADate` string form is `YYYY-MM-DD`.
//! - `EntityName` is trimmed, internal whitespace collapsed, never empty.

use crate::model::framework::errors::InputValidationError;
use crate::model::framework::realm::{string_realm_value, Realm, RealmThing, RealmValue};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Generates the `String` conversions serde uses for string-backed values.
macro_rules! string_backed {
    ($ty:ty) => {
        impl TryFrom<String> for $ty {
            type Error = $crate::model::framework::errors::InputValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.to_string()
            }
        }
    };
}

pub(crate) use string_backed;

/// Stable numeric identity of a persisted entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(i64);

impl EntityId {
    /// Placeholder id carried by entities before their first `create`.
    pub const NEW: EntityId = EntityId(0);

    pub fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    pub fn as_i64(self) -> i64 {
        self.0
    }

    pub fn is_new(self) -> bool {
        self.0 == 0
    }
}

impl Display for EntityId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = InputValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s
            .trim()
            .parse::<i64>()
            .map_err(|_| InputValidationError::new(format!("invalid entity id `{s}`")))?;
        if raw < 0 {
            return Err(InputValidationError::new(format!(
                "entity id must not be negative, got {raw}"
            )));
        }
        Ok(Self(raw))
    }
}

impl RealmValue for EntityId {
    const TYPE_NAME: &'static str = "entity_id";

    fn to_realm(&self, realm: Realm) -> RealmThing {
        match realm {
            Realm::Web | Realm::Cli => RealmThing::String(self.0.to_string()),
            _ => RealmThing::from(self.0),
        }
    }

    fn from_realm(thing: &RealmThing, _realm: Realm) -> Result<Self, InputValidationError> {
        match thing {
            RealmThing::Number(number) => number
                .as_i64()
                .filter(|raw| *raw >= 0)
                .map(Self)
                .ok_or_else(|| InputValidationError::new(format!("invalid entity id `{number}`"))),
            RealmThing::String(raw) => raw.parse(),
            other => Err(InputValidationError::new(format!(
                "expected an entity id, got `{other}`"
            ))),
        }
    }
}

/// A UTC instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn from_datetime(value: DateTime<Utc>) -> Self {
        Self(value)
    }

    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Midnight UTC at the start of `date`.
    pub fn start_of(date: ADate) -> Self {
        Self(Utc.from_utc_datetime(&date.as_naive().and_time(NaiveTime::MIN)))
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    pub fn date(&self) -> ADate {
        ADate(self.0.date_naive())
    }

    pub fn plus_seconds(&self, seconds: i64) -> Self {
        Self(self.0 + Duration::seconds(seconds))
    }

    pub fn unix_seconds(&self) -> i64 {
        self.0.timestamp()
    }

    pub fn from_unix_seconds(seconds: i64) -> Option<Self> {
        DateTime::<Utc>::from_timestamp(seconds, 0).map(Self)
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

impl FromStr for Timestamp {
    type Err = InputValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DateTime::parse_from_rfc3339(s.trim())
            .map(|value| Self(value.with_timezone(&Utc)))
            .map_err(|_| InputValidationError::new(format!("invalid timestamp `{s}`")))
    }
}

string_backed!(Timestamp);
string_realm_value!(Timestamp, "timestamp");

/// A calendar date without time or zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ADate(NaiveDate);

impl ADate {
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self, InputValidationError> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(|| {
                InputValidationError::new(format!("invalid date {year:04}-{month:02}-{day:02}"))
            })
    }

    pub fn from_naive(value: NaiveDate) -> Self {
        Self(value)
    }

    pub fn as_naive(&self) -> NaiveDate {
        self.0
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }

    pub fn add_days(&self, days: i64) -> Self {
        Self(self.0 + Duration::days(days))
    }

    pub fn days_until(&self, other: ADate) -> i64 {
        (other.0 - self.0).num_days()
    }
}

impl Display for ADate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for ADate {
    type Err = InputValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Self)
            .map_err(|_| InputValidationError::new(format!("invalid date `{s}`, expected YYYY-MM-DD")))
    }
}

string_backed!(ADate);
string_realm_value!(ADate, "adate");

/// Human-facing entity name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityName(String);

impl EntityName {
    pub const MAX_LENGTH: usize = 500;

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Builds a name from program-generated text, truncating past the limit.
    pub(crate) fn from_generated(raw: &str) -> Self {
        let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        let truncated: String = normalized.chars().take(Self::MAX_LENGTH).collect();
        if truncated.is_empty() {
            Self("Untitled".to_string())
        } else {
            Self(truncated)
        }
    }
}

impl Display for EntityName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EntityName {
    type Err = InputValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        if normalized.is_empty() {
            return Err(InputValidationError::new("expected a non-empty entity name"));
        }
        if normalized.chars().count() > Self::MAX_LENGTH {
            return Err(InputValidationError::new(format!(
                "entity name is longer than {} characters",
                Self::MAX_LENGTH
            )));
        }
        Ok(Self(normalized))
    }
}

string_backed!(EntityName);
string_realm_value!(EntityName, "entity_name");

#[cfg(test)]
mod tests {
    use super::{ADate, EntityId, EntityName, Timestamp};
    use crate::model::framework::realm::{Realm, RealmThing, RealmValue};

    #[test]
    fn entity_name_collapses_whitespace() {
        let name: EntityName = "  Launch   the\tproduct ".parse().expect("valid name");
        assert_eq!(name.as_str(), "Launch the product");
    }

    #[test]
    fn entity_name_rejects_blank() {
        assert!("   ".parse::<EntityName>().is_err());
    }

    #[test]
    fn adate_parses_and_formats() {
        let date: ADate = "2024-03-04".parse().expect("valid date");
        assert_eq!(date.to_string(), "2024-03-04");
        assert_eq!(date.add_days(-4).to_string(), "2024-02-29");
        assert!("2024-02-30".parse::<ADate>().is_err());
    }

    #[test]
    fn entity_id_accepts_strings_in_web_realm() {
        let id = EntityId::from_realm(&RealmThing::String("17".into()), Realm::Web)
            .expect("numeric string");
        assert_eq!(id.as_i64(), 17);
        assert_eq!(id.to_realm(Realm::Database), RealmThing::from(17));
    }

    #[test]
    fn timestamp_roundtrips_through_its_string_form() {
        let ts: Timestamp = "2024-03-04T10:15:00Z".parse().expect("valid timestamp");
        assert_eq!(ts.to_string(), "2024-03-04T10:15:00.000Z");
        assert_eq!(ts.date().to_string(), "2024-03-04");
    }
}
