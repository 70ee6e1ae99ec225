//! iCal feed parsing into normalized events.

use crate::model::framework::ADate;
use crate::model::values::TimeInDay;
use crate::sync::CalendarSyncError;
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use icalendar::{Calendar, CalendarComponent, CalendarDateTime, Component, DatePerhapsTime};
use std::collections::HashMap;

const DEFAULT_EVENT_MINS: u32 = 60;
const MAX_EVENT_MINS: u32 = 24 * 60;

/// Placement of one feed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalTiming {
    InDay {
        start_date: ADate,
        start_time_in_day: TimeInDay,
        duration_mins: u32,
    },
    FullDays {
        start_date: ADate,
        duration_days: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalEvent {
    pub uid: String,
    /// Raw `RECURRENCE-ID` of an override instance.
    pub recurrence_id: Option<String>,
    pub name: String,
    pub timing: ExternalTiming,
}

impl ExternalEvent {
    /// Identity of the event across syncs; overrides of a recurring event get their own key.
    pub fn sync_key(&self) -> String {
        match &self.recurrence_id {
            Some(recurrence_id) => format!("{}#{}", self.uid, recurrence_id),
            None => self.uid.clone(),
        }
    }
}

fn naive_of(value: CalendarDateTime) -> NaiveDateTime {
    match value {
        CalendarDateTime::Floating(naive) => naive,
        CalendarDateTime::Utc(utc) => utc.naive_utc(),
        // Zoned times keep their wall clock.
        CalendarDateTime::WithTimezone { date_time, .. } => date_time,
    }
}

fn timing_of(
    start: DatePerhapsTime,
    end: Option<DatePerhapsTime>,
) -> Result<ExternalTiming, CalendarSyncError> {
    match start {
        DatePerhapsTime::Date(start) => {
            let end_day: Option<NaiveDate> = match end {
                Some(DatePerhapsTime::Date(end)) => Some(end),
                Some(DatePerhapsTime::DateTime(end)) => Some(naive_of(end).date()),
                None => None,
            };
            // DTEND of an all-day event is exclusive.
            let days = end_day.map_or(1, |end| (end - start).num_days()).max(1);
            Ok(ExternalTiming::FullDays {
                start_date: ADate::from_naive(start),
                duration_days: u32::try_from(days).unwrap_or(u32::MAX),
            })
        }
        DatePerhapsTime::DateTime(start) => {
            let start = naive_of(start);
            let minutes = match end {
                Some(DatePerhapsTime::DateTime(end)) => (naive_of(end) - start).num_minutes(),
                Some(DatePerhapsTime::Date(end)) => {
                    let midnight = end.and_hms_opt(0, 0, 0).unwrap_or(start);
                    (midnight - start).num_minutes()
                }
                None => i64::from(DEFAULT_EVENT_MINS),
            };
            let duration_mins = u32::try_from(minutes.clamp(1, i64::from(MAX_EVENT_MINS)))
                .unwrap_or(DEFAULT_EVENT_MINS);
            let start_time_in_day = TimeInDay::new(start.hour(), start.minute())
                .map_err(|err| CalendarSyncError::Parse(err.to_string()))?;
            Ok(ExternalTiming::InDay {
                start_date: ADate::from_naive(start.date()),
                start_time_in_day,
                duration_mins,
            })
        }
    }
}

/// Parses a feed; events without a uid or a start are skipped.
///
/// Components repeating a sync key collapse into one event, the last one winning.
pub fn parse_calendar(raw: &str) -> Result<Vec<ExternalEvent>, CalendarSyncError> {
    let calendar: Calendar = raw.parse().map_err(CalendarSyncError::Parse)?;
    let mut events: Vec<ExternalEvent> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for component in &calendar.components {
        let CalendarComponent::Event(event) = component else {
            continue;
        };
        let (Some(uid), Some(start)) = (event.get_uid(), event.get_start()) else {
            continue;
        };
        let name = event
            .get_summary()
            .map(str::trim)
            .filter(|summary| !summary.is_empty())
            .unwrap_or("Untitled event");
        let recurrence_id = event
            .property_value("RECURRENCE-ID")
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        let parsed = ExternalEvent {
            uid: uid.to_string(),
            recurrence_id,
            name: name.to_string(),
            timing: timing_of(start, event.get_end())?,
        };
        match positions.get(&parsed.sync_key()) {
            Some(&at) => events[at] = parsed,
            None => {
                positions.insert(parsed.sync_key(), events.len());
                events.push(parsed);
            }
        }
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::{parse_calendar, ExternalTiming};

    const FEED: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//lifeos//test//EN\r\n\
BEGIN:VEVENT\r\n\
UID:standup-1\r\n\
SUMMARY:Standup\r\n\
DTSTART:20240305T093000Z\r\n\
DTEND:20240305T094500Z\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:offsite-1\r\n\
SUMMARY:Offsite\r\n\
DTSTART;VALUE=DATE:20240310\r\n\
DTEND;VALUE=DATE:20240312\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
SUMMARY:No uid\r\n\
DTSTART:20240305T100000Z\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    #[test]
    fn feed_events_become_in_day_and_full_days() {
        let events = parse_calendar(FEED).expect("feed");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].uid, "standup-1");
        assert_eq!(
            events[0].timing,
            ExternalTiming::InDay {
                start_date: "2024-03-05".parse().expect("date"),
                start_time_in_day: "09:30".parse().expect("time"),
                duration_mins: 15,
            }
        );
        assert_eq!(
            events[1].timing,
            ExternalTiming::FullDays {
                start_date: "2024-03-10".parse().expect("date"),
                duration_days: 2,
            }
        );
    }

    const RECURRING: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//lifeos//test//EN\r\n\
BEGIN:VEVENT\r\n\
UID:weekly\r\n\
SUMMARY:Weekly sync\r\n\
DTSTART:20240304T100000Z\r\n\
DTEND:20240304T103000Z\r\n\
RRULE:FREQ=WEEKLY\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:weekly\r\n\
RECURRENCE-ID:20240311T100000Z\r\n\
SUMMARY:Weekly sync (moved)\r\n\
DTSTART:20240311T140000Z\r\n\
DTEND:20240311T143000Z\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:weekly\r\n\
RECURRENCE-ID:20240311T100000Z\r\n\
SUMMARY:Weekly sync (moved again)\r\n\
DTSTART:20240311T150000Z\r\n\
DTEND:20240311T153000Z\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    #[test]
    fn override_of_a_recurring_event_gets_its_own_key() {
        let events = parse_calendar(RECURRING).expect("feed");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].sync_key(), "weekly");
        assert_eq!(events[1].sync_key(), "weekly#20240311T100000Z");
        assert_eq!(events[1].name, "Weekly sync (moved again)");
    }
}
