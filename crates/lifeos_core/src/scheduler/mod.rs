//! Period arithmetic and timeline labels.
//!
//! # Responsibility
//! - Map `(period, reference day)` to its bucket bounds and canonical timeline.
//! - Derive generated-task dates and skip positions from generation params.
//!
//! # Invariants
//! - `first_day <= reference <= end_day` for every schedule.
//! - Two days share a timeline iff they share a bucket of that period.
//!
//! # See also
//! - `service::gen_service` and `service::report_service`, the callers.

mod timeline;

pub use timeline::{timeline_for, MONTH_NAMES};

use crate::model::framework::ADate;
use crate::model::values::{RecurringTaskGenParams, RecurringTaskPeriod};
use chrono::{Datelike, NaiveDate, Weekday};

/// One bucket of a period around a reference day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub period: RecurringTaskPeriod,
    pub reference: ADate,
    pub first_day: ADate,
    pub end_day: ADate,
    pub timeline: String,
}

impl Schedule {
    pub fn new(period: RecurringTaskPeriod, reference: ADate) -> Self {
        let (first_day, end_day) = bounds(period, reference);
        Self {
            period,
            reference,
            first_day,
            end_day,
            timeline: timeline_for(Some(period), reference),
        }
    }

    pub fn contains(&self, day: ADate) -> bool {
        self.first_day <= day && day <= self.end_day
    }

    /// Buckets of the strictly finer periods tiling this one, finest first.
    pub fn sub_schedules(&self) -> Vec<(RecurringTaskPeriod, Vec<Schedule>)> {
        all_smaller_periods(self.period)
            .into_iter()
            .map(|period| (period, schedules_between(period, self.first_day, self.end_day)))
            .collect()
    }

    /// 1-based position used by skip rules.
    pub fn skip_position(&self) -> u32 {
        let day = self.reference.as_naive();
        match self.period {
            RecurringTaskPeriod::Daily => day.weekday().number_from_monday(),
            RecurringTaskPeriod::Weekly => day.iso_week().week(),
            RecurringTaskPeriod::Monthly => day.month(),
            RecurringTaskPeriod::Quarterly => quarter_of(day.month()),
            RecurringTaskPeriod::Yearly => day.year().rem_euclid(100) as u32,
        }
    }

    /// Due date for a task generated from `params` in this bucket.
    pub fn due_date(&self, params: &RecurringTaskGenParams) -> ADate {
        let day = params.due_at_day.map(|day| day.as_u32());
        let month = params.due_at_month.map(|month| month.as_u32());
        if self.period == RecurringTaskPeriod::Daily || (day.is_none() && month.is_none()) {
            return self.end_day;
        }
        self.offset_date(day, month, Anchor::LastMonth)
    }

    /// Actionable date for a task generated from `params`, never after the due date.
    pub fn actionable_date(&self, params: &RecurringTaskGenParams) -> Option<ADate> {
        let day = params.actionable_from_day.map(|day| day.as_u32());
        let month = params.actionable_from_month.map(|month| month.as_u32());
        if day.is_none() && month.is_none() {
            return None;
        }
        let actionable = match self.period {
            RecurringTaskPeriod::Daily => self.first_day,
            _ => self.offset_date(day, month, Anchor::FirstMonth),
        };
        Some(actionable.min(self.due_date(params)))
    }

    fn offset_date(&self, day: Option<u32>, month: Option<u32>, anchor: Anchor) -> ADate {
        let first = self.first_day.as_naive();
        match self.period {
            RecurringTaskPeriod::Daily => self.first_day,
            RecurringTaskPeriod::Weekly => match day {
                Some(day) => self.first_day.add_days(i64::from(day.clamp(1, 7)) - 1),
                None => self.end_day,
            },
            RecurringTaskPeriod::Monthly => {
                day_in_month(first.year(), first.month(), day, anchor == Anchor::LastMonth)
            }
            RecurringTaskPeriod::Quarterly => {
                let month = match anchor {
                    Anchor::FirstMonth => first.month(),
                    Anchor::LastMonth => first.month() + 2,
                };
                day_in_month(first.year(), month, day, anchor == Anchor::LastMonth)
            }
            RecurringTaskPeriod::Yearly => {
                let month = month.unwrap_or(match anchor {
                    Anchor::FirstMonth => 1,
                    Anchor::LastMonth => 12,
                });
                day_in_month(first.year(), month, day, anchor == Anchor::LastMonth)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    FirstMonth,
    LastMonth,
}

/// Periods strictly finer than `period`, finest first.
pub fn all_smaller_periods(period: RecurringTaskPeriod) -> Vec<RecurringTaskPeriod> {
    period.all_smaller()
}

pub fn first_day(period: RecurringTaskPeriod, reference: ADate) -> ADate {
    bounds(period, reference).0
}

pub fn end_day(period: RecurringTaskPeriod, reference: ADate) -> ADate {
    bounds(period, reference).1
}

/// Consecutive buckets of `period` covering `[from, to]`.
pub fn schedules_between(period: RecurringTaskPeriod, from: ADate, to: ADate) -> Vec<Schedule> {
    let mut schedules = Vec::new();
    let mut cursor = from;
    while cursor <= to {
        let schedule = Schedule::new(period, cursor);
        cursor = schedule.end_day.add_days(1);
        schedules.push(schedule);
    }
    schedules
}

fn quarter_of(month: u32) -> u32 {
    (month - 1) / 3 + 1
}

fn bounds(period: RecurringTaskPeriod, reference: ADate) -> (ADate, ADate) {
    let day = reference.as_naive();
    match period {
        RecurringTaskPeriod::Daily => (reference, reference),
        RecurringTaskPeriod::Weekly => {
            let week = day.iso_week();
            let monday = NaiveDate::from_isoywd_opt(week.year(), week.week(), Weekday::Mon).unwrap_or(day);
            let start = ADate::from_naive(monday);
            (start, start.add_days(6))
        }
        RecurringTaskPeriod::Monthly => month_bounds(day.year(), day.month(), day.month()),
        RecurringTaskPeriod::Quarterly => {
            let first_month = (quarter_of(day.month()) - 1) * 3 + 1;
            month_bounds(day.year(), first_month, first_month + 2)
        }
        RecurringTaskPeriod::Yearly => month_bounds(day.year(), 1, 12),
    }
}

fn month_bounds(year: i32, first_month: u32, last_month: u32) -> (ADate, ADate) {
    (
        day_in_month(year, first_month, Some(1), false),
        day_in_month(year, last_month, None, true),
    )
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|next| next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

/// `day` of the month clamped to its length; `None` picks the first or last day.
fn day_in_month(year: i32, month: u32, day: Option<u32>, default_last: bool) -> ADate {
    let length = days_in_month(year, month);
    let day = match day {
        Some(day) => day.clamp(1, length),
        None if default_last => length,
        None => 1,
    };
    NaiveDate::from_ymd_opt(year, month, day)
        .map(ADate::from_naive)
        .unwrap_or_else(|| ADate::from_naive(NaiveDate::MIN))
}

#[cfg(test)]
mod tests {
    use super::{all_smaller_periods, schedules_between, Schedule};
    use crate::model::framework::ADate;
    use crate::model::values::{
        RecurringTaskActionableFromDay, RecurringTaskDueAtDay, RecurringTaskDueAtMonth,
        RecurringTaskGenParams, RecurringTaskPeriod,
    };

    fn day(raw: &str) -> ADate {
        raw.parse().expect("date")
    }

    #[test]
    fn every_bucket_contains_its_reference_day() {
        let mut reference = day("2023-12-25");
        for _ in 0..500 {
            for period in RecurringTaskPeriod::ALL {
                let schedule = Schedule::new(*period, reference);
                assert!(schedule.first_day <= reference && reference <= schedule.end_day);
                for smaller in all_smaller_periods(*period) {
                    assert!(smaller < *period);
                }
            }
            reference = reference.add_days(3);
        }
    }

    #[test]
    fn bucket_bounds_per_period() {
        let reference = day("2024-02-14");
        let weekly = Schedule::new(RecurringTaskPeriod::Weekly, reference);
        assert_eq!(weekly.first_day, day("2024-02-12"));
        assert_eq!(weekly.end_day, day("2024-02-18"));
        let monthly = Schedule::new(RecurringTaskPeriod::Monthly, reference);
        assert_eq!(monthly.end_day, day("2024-02-29"));
        let quarterly = Schedule::new(RecurringTaskPeriod::Quarterly, day("2024-05-02"));
        assert_eq!(quarterly.first_day, day("2024-04-01"));
        assert_eq!(quarterly.end_day, day("2024-06-30"));
    }

    #[test]
    fn sub_schedules_tile_the_bucket() {
        let monthly = Schedule::new(RecurringTaskPeriod::Monthly, day("2024-03-04"));
        let subs = monthly.sub_schedules();
        let (period, daily) = &subs[0];
        assert_eq!(*period, RecurringTaskPeriod::Daily);
        assert_eq!(daily.len(), 31);
        let weekly = schedules_between(RecurringTaskPeriod::Weekly, monthly.first_day, monthly.end_day);
        assert_eq!(weekly.first().map(|s| s.first_day), Some(day("2024-02-26")));
        assert_eq!(weekly.last().map(|s| s.end_day), Some(day("2024-03-31")));
    }

    #[test]
    fn due_and_actionable_dates_follow_params() {
        let mut params = RecurringTaskGenParams::simple(RecurringTaskPeriod::Monthly);
        params.due_at_day = Some(RecurringTaskDueAtDay::from_raw(31).expect("day"));
        params.actionable_from_day = Some(RecurringTaskActionableFromDay::from_raw(10).expect("day"));
        let february = Schedule::new(RecurringTaskPeriod::Monthly, day("2023-02-03"));
        assert_eq!(february.due_date(&params), day("2023-02-28"));
        assert_eq!(february.actionable_date(&params), Some(day("2023-02-10")));

        let mut weekly = RecurringTaskGenParams::simple(RecurringTaskPeriod::Weekly);
        let week = Schedule::new(RecurringTaskPeriod::Weekly, day("2024-03-06"));
        assert_eq!(week.due_date(&weekly), day("2024-03-10"));
        weekly.due_at_day = Some(RecurringTaskDueAtDay::from_raw(3).expect("day"));
        assert_eq!(week.due_date(&weekly), day("2024-03-06"));

        let mut yearly = RecurringTaskGenParams::simple(RecurringTaskPeriod::Yearly);
        yearly.due_at_month = Some(RecurringTaskDueAtMonth::from_raw(4).expect("month"));
        yearly.due_at_day = Some(RecurringTaskDueAtDay::from_raw(15).expect("day"));
        let year = Schedule::new(RecurringTaskPeriod::Yearly, day("2024-08-01"));
        assert_eq!(year.due_date(&yearly), day("2024-04-15"));
    }

    #[test]
    fn skip_positions_per_period() {
        let reference = day("2024-03-04");
        assert_eq!(Schedule::new(RecurringTaskPeriod::Daily, reference).skip_position(), 1);
        assert_eq!(Schedule::new(RecurringTaskPeriod::Weekly, reference).skip_position(), 10);
        assert_eq!(Schedule::new(RecurringTaskPeriod::Monthly, reference).skip_position(), 3);
        assert_eq!(Schedule::new(RecurringTaskPeriod::Quarterly, reference).skip_position(), 1);
        assert_eq!(Schedule::new(RecurringTaskPeriod::Yearly, reference).skip_position(), 24);
    }
}
