//! Canonical timeline strings.
//!
//! Formats, with ISO weeks starting on Monday:
//! - yearly `2024`, quarterly `2024,Q1`, monthly `2024,Q1,Mar`
//! - weekly `2024,Q1,Mar,W10`, year, quarter and month taken from the week's Monday
//! - daily `2024,Q1,Mar,W10,D1`
//! - lifetime `lifetime`

use crate::model::framework::ADate;
use crate::model::gamification::LIFETIME_TIMELINE;
use crate::model::values::RecurringTaskPeriod;
use chrono::{Datelike, Duration, NaiveDate};

pub const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

fn calendar_prefix(date: NaiveDate) -> (i32, u32, &'static str) {
    let quarter = (date.month() - 1) / 3 + 1;
    (date.year(), quarter, MONTH_NAMES[(date.month() - 1) as usize])
}

/// Timeline of the `period` bucket containing `day`; `None` is the lifetime bucket.
pub fn timeline_for(period: Option<RecurringTaskPeriod>, day: ADate) -> String {
    let date = day.as_naive();
    let (year, quarter, month) = calendar_prefix(date);
    let week = date.iso_week();
    match period {
        None => LIFETIME_TIMELINE.to_string(),
        Some(RecurringTaskPeriod::Yearly) => format!("{year}"),
        Some(RecurringTaskPeriod::Quarterly) => format!("{year},Q{quarter}"),
        Some(RecurringTaskPeriod::Monthly) => format!("{year},Q{quarter},{month}"),
        Some(RecurringTaskPeriod::Weekly) => {
            let monday = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
            let (year, quarter, month) = calendar_prefix(monday);
            format!("{year},Q{quarter},{month},W{}", week.week())
        }
        Some(RecurringTaskPeriod::Daily) => format!(
            "{year},Q{quarter},{month},W{},D{}",
            week.week(),
            date.weekday().number_from_monday()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::timeline_for;
    use crate::model::framework::ADate;
    use crate::model::values::RecurringTaskPeriod;

    fn day(raw: &str) -> ADate {
        raw.parse().expect("date")
    }

    #[test]
    fn daily_timeline_names_every_coarser_bucket() {
        assert_eq!(
            timeline_for(Some(RecurringTaskPeriod::Daily), day("2024-03-04")),
            "2024,Q1,Mar,W10,D1"
        );
        assert_eq!(
            timeline_for(Some(RecurringTaskPeriod::Daily), day("2024-03-10")),
            "2024,Q1,Mar,W10,D7"
        );
    }

    #[test]
    fn coarser_timelines() {
        let reference = day("2024-11-20");
        assert_eq!(timeline_for(Some(RecurringTaskPeriod::Yearly), reference), "2024");
        assert_eq!(timeline_for(Some(RecurringTaskPeriod::Quarterly), reference), "2024,Q4");
        assert_eq!(timeline_for(Some(RecurringTaskPeriod::Monthly), reference), "2024,Q4,Nov");
        assert_eq!(timeline_for(None, reference), "lifetime");
    }

    #[test]
    fn weekly_timeline_is_anchored_at_its_monday() {
        assert_eq!(timeline_for(Some(RecurringTaskPeriod::Weekly), day("2024-03-07")), "2024,Q1,Mar,W10");
        assert_eq!(timeline_for(Some(RecurringTaskPeriod::Weekly), day("2025-01-01")), "2024,Q4,Dec,W1");
        assert_eq!(timeline_for(Some(RecurringTaskPeriod::Weekly), day("2024-01-03")), "2024,Q1,Jan,W1");
        assert_eq!(
            timeline_for(Some(RecurringTaskPeriod::Weekly), day("2024-05-01")),
            "2024,Q2,Apr,W18"
        );
        assert_eq!(
            timeline_for(Some(RecurringTaskPeriod::Weekly), day("2024-12-29")),
            timeline_for(Some(RecurringTaskPeriod::Weekly), day("2024-12-23"))
        );
    }
}
