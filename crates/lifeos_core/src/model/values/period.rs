//! Recurrence periods.

use crate::model::framework::enum_value::enum_value;

enum_value! {
    /// Length of a recurrence bucket, finest first.
    pub enum RecurringTaskPeriod("recurring_task_period") {
        Daily => "daily",
        Weekly => "weekly",
        Monthly => "monthly",
        Quarterly => "quarterly",
        Yearly => "yearly",
    }
}

impl RecurringTaskPeriod {
    /// Periods strictly finer than `self`, finest first.
    pub fn all_smaller(self) -> Vec<RecurringTaskPeriod> {
        Self::ALL
            .iter()
            .copied()
            .filter(|period| *period < self)
            .collect()
    }

    pub fn approximate_days(self) -> i64 {
        match self {
            Self::Daily => 1,
            Self::Weekly => 7,
            Self::Monthly => 30,
            Self::Quarterly => 91,
            Self::Yearly => 365,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RecurringTaskPeriod;

    #[test]
    fn smaller_periods_are_strictly_finer() {
        assert!(RecurringTaskPeriod::Daily.all_smaller().is_empty());
        assert_eq!(
            RecurringTaskPeriod::Monthly.all_smaller(),
            vec![RecurringTaskPeriod::Daily, RecurringTaskPeriod::Weekly]
        );
    }
}
