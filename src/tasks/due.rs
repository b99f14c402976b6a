//! Combining a calendar date and an optional time-of-day into a deadline.
//!
//! Dates and times are entered in local time; the stored deadline is an
//! absolute UTC timestamp. Each date is resolved with the offset its zone
//! has on that date, so deadlines across a daylight saving change keep
//! their wall-clock time.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::error::TaskError;
use crate::ports::LocalZone;

/// Parses a time-of-day field.
///
/// Accepts `HH:MM` on a 24-hour clock. An empty or blank field means
/// "no time" and yields `None`.
///
/// # Errors
///
/// Returns [`TaskError::Validation`] for anything else.
pub fn parse_time(input: &str) -> Result<Option<NaiveTime>, TaskError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    NaiveTime::parse_from_str(input, "%H:%M")
        .map(Some)
        .map_err(|_| TaskError::Validation(format!("Invalid time {input:?}; expected HH:MM")))
}

/// Parses a `YYYY-MM-DD` date field.
///
/// # Errors
///
/// Returns [`TaskError::Validation`] if the date is malformed.
pub fn parse_date(input: &str) -> Result<NaiveDate, TaskError> {
    let input = input.trim();
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|_| TaskError::Validation(format!("Invalid date {input:?}; expected YYYY-MM-DD")))
}

/// Formats a time-of-day the way the time field displays it.
#[must_use]
pub fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Builds the deadline for a date and optional time.
///
/// Without a date there is no deadline, even if a time was entered.
/// Without a time the deadline is local midnight of the date.
#[must_use]
pub fn combine(
    date: Option<NaiveDate>,
    time: Option<NaiveTime>,
    zone: LocalZone,
) -> Option<DateTime<Utc>> {
    let date = date?;
    Some(zone.resolve(date.and_time(time.unwrap_or(NaiveTime::MIN))))
}

/// Splits a deadline back into the local date and `HH:MM` time fields.
#[must_use]
pub fn split(due: DateTime<Utc>, zone: LocalZone) -> (NaiveDate, String) {
    let local = zone.localize(due);
    (local.date_naive(), format_time(local.time()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    fn utc() -> LocalZone {
        LocalZone::utc()
    }

    fn berlin() -> LocalZone {
        LocalZone::Named(chrono_tz::Europe::Berlin)
    }

    #[test]
    fn date_and_time_combine_to_that_instant() {
        let date = NaiveDate::from_ymd_opt(2025, 4, 9).unwrap();
        let time = NaiveTime::from_hms_opt(14, 30, 0).unwrap();
        assert_eq!(
            combine(Some(date), Some(time), utc()),
            Some(Utc.with_ymd_and_hms(2025, 4, 9, 14, 30, 0).unwrap())
        );
    }

    #[test]
    fn date_alone_means_local_midnight() {
        let date = NaiveDate::from_ymd_opt(2025, 4, 9).unwrap();
        let offset = FixedOffset::west_opt(3 * 3600).unwrap();
        let due = combine(Some(date), None, LocalZone::Fixed(offset)).unwrap();
        assert_eq!(due, Utc.with_ymd_and_hms(2025, 4, 9, 3, 0, 0).unwrap());
        assert_eq!(due.with_timezone(&offset).time(), NaiveTime::default());
    }

    #[test]
    fn midnight_uses_the_offset_of_the_chosen_date() {
        // Entered in October (+02:00) for a December date (+01:00).
        let date = NaiveDate::from_ymd_opt(2026, 12, 1).unwrap();
        let due = combine(Some(date), None, berlin()).unwrap();
        assert_eq!(due, Utc.with_ymd_and_hms(2026, 11, 30, 23, 0, 0).unwrap());
        assert_eq!(split(due, berlin()), (date, "00:00".to_string()));
    }

    #[test]
    fn time_keeps_its_wall_clock_reading_across_clock_changes() {
        let time = parse_time("09:15").unwrap();
        let summer = NaiveDate::from_ymd_opt(2026, 10, 24).unwrap();
        let winter = NaiveDate::from_ymd_opt(2026, 10, 26).unwrap();
        let before = combine(Some(summer), time, berlin()).unwrap();
        let after = combine(Some(winter), time, berlin()).unwrap();
        assert_eq!(before, Utc.with_ymd_and_hms(2026, 10, 24, 7, 15, 0).unwrap());
        assert_eq!(after, Utc.with_ymd_and_hms(2026, 10, 26, 8, 15, 0).unwrap());
        assert_eq!(split(after, berlin()), (winter, "09:15".to_string()));
    }

    #[test]
    fn time_without_date_is_no_deadline() {
        let time = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        assert_eq!(combine(None, Some(time), utc()), None);
    }

    #[test]
    fn split_reverses_combine() {
        let zone = LocalZone::Fixed(FixedOffset::east_opt(9 * 3600).unwrap());
        let date = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();
        let time = parse_time("23:05").unwrap();
        let due = combine(Some(date), time, zone).unwrap();
        assert_eq!(split(due, zone), (date, "23:05".to_string()));
    }

    #[test]
    fn parse_time_accepts_blank_and_rejects_garbage() {
        assert_eq!(parse_time("  ").unwrap(), None);
        assert_eq!(parse_time("07:45").unwrap(), NaiveTime::from_hms_opt(7, 45, 0));
        assert!(matches!(parse_time("25:00"), Err(TaskError::Validation(_))));
        assert!(matches!(parse_time("noon"), Err(TaskError::Validation(_))));
    }

    #[test]
    fn parse_date_requires_iso_format() {
        let parsed = parse_date("2025-02-28").unwrap();
        assert_eq!(parsed, NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
        assert!(parse_date("28/02/2025").is_err());
    }
}
