//! Wall-clock time within a day.

use crate::model::framework::base::string_backed;
use crate::model::framework::errors::InputValidationError;
use crate::model::framework::realm::string_realm_value;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

static TIME_IN_DAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2}):(\d{2})$").expect("valid time regex"));

/// `HH:MM`, ordered by minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeInDay {
    hour: u32,
    minute: u32,
}

impl TimeInDay {
    pub fn new(hour: u32, minute: u32) -> Result<Self, InputValidationError> {
        if hour > 23 {
            return Err(InputValidationError::new(format!(
                "hour must be between 0 and 23, got {hour}"
            )));
        }
        if minute > 59 {
            return Err(InputValidationError::new(format!(
                "minute must be between 0 and 59, got {minute}"
            )));
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(self) -> u32 {
        self.hour
    }

    pub fn minute(self) -> u32 {
        self.minute
    }

    pub fn minutes_since_midnight(self) -> u32 {
        self.hour * 60 + self.minute
    }
}

impl Display for TimeInDay {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for TimeInDay {
    type Err = InputValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let captures = TIME_IN_DAY_RE
            .captures(s.trim())
            .ok_or_else(|| InputValidationError::new(format!("invalid time `{s}`, expected HH:MM")))?;
        let hour = captures[1]
            .parse::<u32>()
            .map_err(|_| InputValidationError::new(format!("invalid hour in `{s}`")))?;
        let minute = captures[2]
            .parse::<u32>()
            .map_err(|_| InputValidationError::new(format!("invalid minute in `{s}`")))?;
        Self::new(hour, minute)
    }
}

string_backed!(TimeInDay);
string_realm_value!(TimeInDay, "time_in_day");

#[cfg(test)]
mod tests {
    use super::TimeInDay;

    #[test]
    fn parses_and_orders() {
        let early: TimeInDay = "7:05".parse().expect("valid");
        let late: TimeInDay = "23:59".parse().expect("valid");
        assert!(early < late);
        assert_eq!(early.to_string(), "07:05");
        assert!("24:00".parse::<TimeInDay>().is_err());
        assert!("12:60".parse::<TimeInDay>().is_err());
    }
}
