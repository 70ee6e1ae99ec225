//! Addressing values: email addresses, URLs and timezone names.

use crate::model::framework::base::string_backed;
use crate::model::framework::errors::InputValidationError;
use crate::model::framework::realm::string_realm_value;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$",
    )
    .expect("valid email regex")
});

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?i)(https?|webcal)://[^\s/$.?#][^\s]*$").expect("valid url regex"));

static TIMEZONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z_]*(?:/[A-Za-z0-9_+\-]+)*$").expect("valid timezone regex")
});

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for EmailAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EmailAddress {
    type Err = InputValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.len() > 254 || !EMAIL_RE.is_match(trimmed) {
            return Err(InputValidationError::new(format!(
                "invalid email address `{trimmed}`"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }
}

string_backed!(EmailAddress);
string_realm_value!(EmailAddress, "email_address");

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Url(String);

impl Url {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `webcal://` is fetched over HTTPS.
    pub fn to_fetchable(&self) -> String {
        let lower = self.0.to_ascii_lowercase();
        if lower.starts_with("webcal://") {
            return format!("https://{}", &self.0["webcal://".len()..]);
        }
        self.0.clone()
    }
}

impl Display for Url {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Url {
    type Err = InputValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if !URL_RE.is_match(trimmed) {
            return Err(InputValidationError::new(format!("invalid url `{trimmed}`")));
        }
        Ok(Self(trimmed.to_string()))
    }
}

string_backed!(Url);
string_realm_value!(Url, "url");

/// IANA timezone name such as `Europe/Bucharest` or `UTC`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timezone(String);

impl Timezone {
    pub fn utc() -> Self {
        Self("UTC".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Timezone {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Timezone {
    type Err = InputValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.len() > 64 || !TIMEZONE_RE.is_match(trimmed) {
            return Err(InputValidationError::new(format!("invalid timezone `{trimmed}`")));
        }
        Ok(Self(trimmed.to_string()))
    }
}

string_backed!(Timezone);
string_realm_value!(Timezone, "timezone");

#[cfg(test)]
mod tests {
    use super::{EmailAddress, Timezone, Url};

    #[test]
    fn email_accepts_short_domains() {
        assert!("a@b.c".parse::<EmailAddress>().is_ok());
        assert!("alice@example".parse::<EmailAddress>().is_ok());
        assert!("not an email".parse::<EmailAddress>().is_err());
        assert!("@example.com".parse::<EmailAddress>().is_err());
    }

    #[test]
    fn webcal_urls_fetch_over_https() {
        let url: Url = "webcal://cal.example.com/feed.ics".parse().expect("valid url");
        assert_eq!(url.to_fetchable(), "https://cal.example.com/feed.ics");
        assert!("ftp://x".parse::<Url>().is_err());
    }

    #[test]
    fn timezone_names() {
        assert!("Europe/Bucharest".parse::<Timezone>().is_ok());
        assert!("America/Argentina/Buenos_Aires".parse::<Timezone>().is_ok());
        assert!("no spaces/allowed here".parse::<Timezone>().is_err());
    }
}
