//! Yearly birthday as `D Mon`.

use crate::model::framework::base::{string_backed, ADate};
use crate::model::framework::errors::InputValidationError;
use crate::model::framework::realm::string_realm_value;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const MAX_DAYS: [u32; 12] = [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PersonBirthday {
    month: u32,
    day: u32,
}

impl PersonBirthday {
    pub fn new(day: u32, month: u32) -> Result<Self, InputValidationError> {
        if !(1..=12).contains(&month) {
            return Err(InputValidationError::new(format!(
                "birthday month must be between 1 and 12, got {month}"
            )));
        }
        let max_day = MAX_DAYS[(month - 1) as usize];
        if day < 1 || day > max_day {
            return Err(InputValidationError::new(format!(
                "birthday day for {} must be between 1 and {}, got {}",
                MONTH_NAMES[(month - 1) as usize],
                max_day,
                day
            )));
        }
        Ok(Self { month, day })
    }

    pub fn day(self) -> u32 {
        self.day
    }

    pub fn month(self) -> u32 {
        self.month
    }

    /// The birthday in `year`; 29 Feb falls on 28 Feb in non-leap years.
    pub fn in_year(self, year: i32) -> Result<ADate, InputValidationError> {
        ADate::from_ymd(year, self.month, self.day)
            .or_else(|_| ADate::from_ymd(year, self.month, self.day - 1))
    }
}

impl Display for PersonBirthday {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.day, MONTH_NAMES[(self.month - 1) as usize])
    }
}

impl FromStr for PersonBirthday {
    type Err = InputValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let (Some(day), Some(month), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(InputValidationError::new(format!(
                "invalid birthday `{s}`, expected `D Mon`"
            )));
        };
        let day = day
            .parse::<u32>()
            .map_err(|_| InputValidationError::new(format!("invalid birthday day in `{s}`")))?;
        let month = MONTH_NAMES
            .iter()
            .position(|name| name.eq_ignore_ascii_case(month))
            .ok_or_else(|| InputValidationError::new(format!("invalid birthday month in `{s}`")))?;
        Self::new(day, month as u32 + 1)
    }
}

string_backed!(PersonBirthday);
string_realm_value!(PersonBirthday, "person_birthday");

#[cfg(test)]
mod tests {
    use super::PersonBirthday;

    #[test]
    fn parses_english_month_names() {
        let birthday: PersonBirthday = "15 mar".parse().expect("valid birthday");
        assert_eq!(birthday.to_string(), "15 Mar");
        assert!("31 Apr".parse::<PersonBirthday>().is_err());
        assert!("3 Smarch".parse::<PersonBirthday>().is_err());
    }

    #[test]
    fn leap_day_moves_in_common_years() {
        let birthday: PersonBirthday = "29 Feb".parse().expect("leap day");
        assert_eq!(birthday.in_year(2023).expect("date").to_string(), "2023-02-28");
        assert_eq!(birthday.in_year(2024).expect("date").to_string(), "2024-02-29");
    }
}
