//! Recurring generation parameters.
//!
//! # Invariants
//! - Due-at/actionable-from days are bounded by the period:
//!   daily `{0}`, weekly `1..=6`, monthly/quarterly/yearly `1..=31`.
//! - Due-at/actionable-from months are `1..=12` and only valid for yearly periods.
//! - Skip rules are a 128-bit position mask, `none`, `even` or `odd`.

use crate::model::framework::errors::{InputValidationError, ValidationResult};
use crate::model::framework::realm::{serde_realm_value, string_realm_value, Realm, RealmThing, RealmValue};
use crate::model::framework::base::string_backed;
use crate::model::values::period::RecurringTaskPeriod;
use crate::model::values::status::{Difficulty, Eisen};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

macro_rules! bounded_number {
    ($name:ident, $type_name:literal, $min:expr, $max:expr) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "u32", into = "u32")]
        pub struct $name(u32);

        impl $name {
            pub fn from_raw(raw: u32) -> ValidationResult<Self> {
                if !($min..=$max).contains(&raw) {
                    return Err(InputValidationError::new(format!(
                        "{} must be between {} and {}, got {}",
                        $type_name, $min, $max, raw
                    )));
                }
                Ok(Self(raw))
            }

            pub fn as_u32(self) -> u32 {
                self.0
            }
        }

        impl TryFrom<u32> for $name {
            type Error = InputValidationError;

            fn try_from(value: u32) -> Result<Self, Self::Error> {
                Self::from_raw(value)
            }
        }

        impl From<$name> for u32 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl RealmValue for $name {
            const TYPE_NAME: &'static str = $type_name;

            fn to_realm(&self, _realm: Realm) -> RealmThing {
                RealmThing::from(self.0)
            }

            fn from_realm(thing: &RealmThing, _realm: Realm) -> ValidationResult<Self> {
                let raw = match thing {
                    RealmThing::Number(number) => number.as_u64(),
                    RealmThing::String(raw) => raw.trim().parse::<u64>().ok(),
                    _ => None,
                }
                .and_then(|raw| u32::try_from(raw).ok())
                .ok_or_else(|| {
                    InputValidationError::new(format!("expected a number for {}, got `{}`", $type_name, thing))
                })?;
                Self::from_raw(raw)
            }
        }
    };
}

bounded_number!(RecurringTaskDueAtDay, "recurring_task_due_at_day", 0, 31);
bounded_number!(RecurringTaskDueAtMonth, "recurring_task_due_at_month", 1, 12);
bounded_number!(RecurringTaskActionableFromDay, "recurring_task_actionable_from_day", 0, 31);
bounded_number!(RecurringTaskActionableFromMonth, "recurring_task_actionable_from_month", 1, 12);

fn check_day_for_period(period: RecurringTaskPeriod, day: u32, what: &str) -> ValidationResult<()> {
    let (min, max) = match period {
        RecurringTaskPeriod::Daily => (0, 0),
        RecurringTaskPeriod::Weekly => (1, 6),
        RecurringTaskPeriod::Monthly
        | RecurringTaskPeriod::Quarterly
        | RecurringTaskPeriod::Yearly => (1, 31),
    };
    if day < min || day > max {
        return Err(InputValidationError::new(format!(
            "{what} day for a {period} period must be between {min} and {max}, got {day}"
        )));
    }
    Ok(())
}

fn check_month_for_period(period: RecurringTaskPeriod, what: &str) -> ValidationResult<()> {
    if period != RecurringTaskPeriod::Yearly {
        return Err(InputValidationError::new(format!(
            "{what} month is only valid for a yearly period, got {period}"
        )));
    }
    Ok(())
}

impl RecurringTaskDueAtDay {
    pub fn for_period(period: RecurringTaskPeriod, raw: u32) -> ValidationResult<Self> {
        check_day_for_period(period, raw, "due at")?;
        Self::from_raw(raw)
    }
}

impl RecurringTaskDueAtMonth {
    pub fn for_period(period: RecurringTaskPeriod, raw: u32) -> ValidationResult<Self> {
        check_month_for_period(period, "due at")?;
        Self::from_raw(raw)
    }
}

/// Periods in which generation is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RecurringTaskSkipRule {
    None,
    Even,
    Odd,
    Positions(u128),
}

impl Default for RecurringTaskSkipRule {
    fn default() -> Self {
        Self::None
    }
}

impl RecurringTaskSkipRule {
    pub const MAX_POSITION: u32 = 127;

    pub fn from_positions(positions: &[u32]) -> ValidationResult<Self> {
        let mut mask = 0_u128;
        for position in positions {
            if *position > Self::MAX_POSITION {
                return Err(InputValidationError::new(format!(
                    "skip rule position must be at most {}, got {}",
                    Self::MAX_POSITION,
                    position
                )));
            }
            mask |= 1_u128 << position;
        }
        if mask == 0 {
            return Ok(Self::None);
        }
        Ok(Self::Positions(mask))
    }

    /// Whether generation is skipped at `position` of the period.
    pub fn skips(&self, position: u32) -> bool {
        match self {
            Self::None => false,
            Self::Even => position % 2 == 0,
            Self::Odd => position % 2 == 1,
            Self::Positions(mask) => position <= Self::MAX_POSITION && mask & (1_u128 << position) != 0,
        }
    }
}

impl Display for RecurringTaskSkipRule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Even => f.write_str("even"),
            Self::Odd => f.write_str("odd"),
            Self::Positions(mask) => {
                let positions = (0..=Self::MAX_POSITION)
                    .filter(|position| mask & (1_u128 << position) != 0)
                    .map(|position| position.to_string())
                    .collect::<Vec<_>>();
                f.write_str(&positions.join(","))
            }
        }
    }
}

impl FromStr for RecurringTaskSkipRule {
    type Err = InputValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().to_ascii_lowercase();
        match trimmed.as_str() {
            "" | "none" => Ok(Self::None),
            "even" => Ok(Self::Even),
            "odd" => Ok(Self::Odd),
            list => {
                let positions = list
                    .split(',')
                    .map(|part| {
                        part.trim().parse::<u32>().map_err(|_| {
                            InputValidationError::new(format!("invalid skip rule `{s}`"))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Self::from_positions(&positions)
            }
        }
    }
}

string_backed!(RecurringTaskSkipRule);
string_realm_value!(RecurringTaskSkipRule, "recurring_task_skip_rule");

#[derive(Debug, Clone, Deserialize)]
struct RawGenParams {
    period: RecurringTaskPeriod,
    #[serde(default)]
    eisen: Option<Eisen>,
    #[serde(default)]
    difficulty: Option<Difficulty>,
    #[serde(default)]
    actionable_from_day: Option<RecurringTaskActionableFromDay>,
    #[serde(default)]
    actionable_from_month: Option<RecurringTaskActionableFromMonth>,
    #[serde(default)]
    due_at_day: Option<RecurringTaskDueAtDay>,
    #[serde(default)]
    due_at_month: Option<RecurringTaskDueAtMonth>,
    #[serde(default)]
    skip_rule: RecurringTaskSkipRule,
}

/// Parameters copied onto every generated inbox task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawGenParams")]
pub struct RecurringTaskGenParams {
    pub period: RecurringTaskPeriod,
    pub eisen: Option<Eisen>,
    pub difficulty: Option<Difficulty>,
    pub actionable_from_day: Option<RecurringTaskActionableFromDay>,
    pub actionable_from_month: Option<RecurringTaskActionableFromMonth>,
    pub due_at_day: Option<RecurringTaskDueAtDay>,
    pub due_at_month: Option<RecurringTaskDueAtMonth>,
    pub skip_rule: RecurringTaskSkipRule,
}

impl TryFrom<RawGenParams> for RecurringTaskGenParams {
    type Error = InputValidationError;

    fn try_from(raw: RawGenParams) -> Result<Self, Self::Error> {
        let params = Self {
            period: raw.period,
            eisen: raw.eisen,
            difficulty: raw.difficulty,
            actionable_from_day: raw.actionable_from_day,
            actionable_from_month: raw.actionable_from_month,
            due_at_day: raw.due_at_day,
            due_at_month: raw.due_at_month,
            skip_rule: raw.skip_rule,
        };
        params.validate()?;
        Ok(params)
    }
}

impl RecurringTaskGenParams {
    /// Plain parameters for `period` with no offsets and no skip rule.
    pub fn simple(period: RecurringTaskPeriod) -> Self {
        Self {
            period,
            eisen: None,
            difficulty: None,
            actionable_from_day: None,
            actionable_from_month: None,
            due_at_day: None,
            due_at_month: None,
            skip_rule: RecurringTaskSkipRule::None,
        }
    }

    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(day) = self.actionable_from_day {
            check_day_for_period(self.period, day.as_u32(), "actionable from")?;
        }
        if self.actionable_from_month.is_some() {
            check_month_for_period(self.period, "actionable from")?;
        }
        if let Some(day) = self.due_at_day {
            check_day_for_period(self.period, day.as_u32(), "due at")?;
        }
        if self.due_at_month.is_some() {
            check_month_for_period(self.period, "due at")?;
        }
        if let (Some(from), Some(due)) = (self.actionable_from_month, self.due_at_month) {
            if from.as_u32() > due.as_u32() {
                return Err(InputValidationError::new(
                    "actionable from month must not be after due at month",
                ));
            }
        }
        Ok(())
    }
}

serde_realm_value!(RecurringTaskGenParams, "recurring_task_gen_params");

#[cfg(test)]
mod tests {
    use super::{
        RecurringTaskDueAtDay, RecurringTaskDueAtMonth, RecurringTaskGenParams,
        RecurringTaskSkipRule,
    };
    use crate::model::values::period::RecurringTaskPeriod;

    #[test]
    fn due_day_bounds_depend_on_period() {
        assert!(RecurringTaskDueAtDay::for_period(RecurringTaskPeriod::Daily, 0).is_ok());
        assert!(RecurringTaskDueAtDay::for_period(RecurringTaskPeriod::Daily, 1).is_err());
        assert!(RecurringTaskDueAtDay::for_period(RecurringTaskPeriod::Weekly, 6).is_ok());
        assert!(RecurringTaskDueAtDay::for_period(RecurringTaskPeriod::Weekly, 7).is_err());
        assert!(RecurringTaskDueAtDay::for_period(RecurringTaskPeriod::Monthly, 31).is_ok());
        assert!(RecurringTaskDueAtDay::for_period(RecurringTaskPeriod::Monthly, 32).is_err());
    }

    #[test]
    fn due_month_only_for_yearly() {
        assert!(RecurringTaskDueAtMonth::for_period(RecurringTaskPeriod::Yearly, 12).is_ok());
        assert!(RecurringTaskDueAtMonth::for_period(RecurringTaskPeriod::Quarterly, 2).is_err());
    }

    #[test]
    fn skip_rule_string_forms() {
        let rule: RecurringTaskSkipRule = "1,3,5".parse().expect("positions");
        assert!(rule.skips(3));
        assert!(!rule.skips(2));
        assert_eq!(rule.to_string(), "1,3,5");
        assert!("even".parse::<RecurringTaskSkipRule>().expect("even").skips(4));
        assert!("x,y".parse::<RecurringTaskSkipRule>().is_err());
    }

    #[test]
    fn gen_params_deserialization_validates() {
        let err = serde_json::from_str::<RecurringTaskGenParams>(
            r#"{"period":"monthly","due_at_month":3}"#,
        );
        assert!(err.is_err());
        let ok: RecurringTaskGenParams =
            serde_json::from_str(r#"{"period":"yearly","due_at_month":3,"due_at_day":15}"#)
                .expect("valid yearly params");
        assert_eq!(ok.due_at_day.map(|d| d.as_u32()), Some(15));
    }
}
