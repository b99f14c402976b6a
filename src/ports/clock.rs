//! Clock port for obtaining the current time.

use chrono::{
    DateTime, Duration, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset,
    TimeZone, Utc,
};
use chrono_tz::Tz;

/// Time zone that decides what "today" and an entered date mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalZone {
    /// The operating system's zone, daylight saving included.
    System,
    /// A named zone such as `Europe/Berlin`.
    Named(Tz),
    /// A fixed offset that never changes.
    Fixed(FixedOffset),
}

impl LocalZone {
    /// Fixed UTC.
    #[must_use]
    pub fn utc() -> Self {
        Self::Fixed(Utc.fix())
    }

    /// Wall-clock reading of `instant` in this zone.
    #[must_use]
    pub fn localize(self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        match self {
            Self::System => instant.with_timezone(&chrono::Local).fixed_offset(),
            Self::Named(tz) => instant.with_timezone(&tz).fixed_offset(),
            Self::Fixed(offset) => instant.with_timezone(&offset),
        }
    }

    /// Local calendar date of `instant`.
    #[must_use]
    pub fn date_of(self, instant: DateTime<Utc>) -> NaiveDate {
        self.localize(instant).date_naive()
    }

    /// The instant a local wall-clock time refers to, using the offset in
    /// effect on that date.
    ///
    /// A time repeated when clocks go back resolves to its earlier
    /// occurrence. A time skipped when clocks go forward is read an hour
    /// later, past the gap.
    #[must_use]
    pub fn resolve(self, local: NaiveDateTime) -> DateTime<Utc> {
        self.resolve_exact(local)
            .or_else(|| self.resolve_exact(local + Duration::hours(1)))
            .unwrap_or_else(|| local.and_utc())
    }

    fn resolve_exact(self, local: NaiveDateTime) -> Option<DateTime<Utc>> {
        match self {
            Self::System => earliest(&chrono::Local, local),
            Self::Named(tz) => earliest(&tz, local),
            Self::Fixed(offset) => earliest(&offset, local),
        }
    }
}

fn earliest<Z: TimeZone>(zone: &Z, local: NaiveDateTime) -> Option<DateTime<Utc>> {
    match zone.from_local_datetime(&local) {
        LocalResult::Single(at) => Some(at.with_timezone(&Utc)),
        LocalResult::Ambiguous(first, second) => {
            tracing::debug!(%local, "ambiguous local time; using the earlier instant");
            Some(first.min(second).with_timezone(&Utc))
        }
        LocalResult::None => None,
    }
}

/// Half-open interval `[start, end)` covering one local calendar day.
///
/// Days that contain a clock change are 23 or 25 hours long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayBounds {
    /// Local midnight at the start of the day, in UTC.
    pub start: DateTime<Utc>,
    /// Local midnight at the start of the next day, in UTC.
    pub end: DateTime<Utc>,
}

impl DayBounds {
    /// Bounds of `date` as observed in `zone`.
    #[must_use]
    pub fn of(date: NaiveDate, zone: LocalZone) -> Self {
        let start = zone.resolve(date.and_time(NaiveTime::MIN));
        let end = date.succ_opt().map_or(start + Duration::days(1), |next| {
            zone.resolve(next.and_time(NaiveTime::MIN))
        });
        Self { start, end }
    }

    /// Whether `instant` falls within the day.
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// Provides the current time.
///
/// Abstracting time access allows deterministic replay by substituting
/// a fixed or recorded clock during tests and cassette playback.
pub trait Clock: Send + Sync {
    /// Returns the current UTC time.
    fn now(&self) -> DateTime<Utc>;

    /// Returns the bounds of the current local day in `zone`.
    fn today(&self, zone: LocalZone) -> DayBounds {
        DayBounds::of(zone.date_of(self.now()), zone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct At(DateTime<Utc>);

    impl Clock for At {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn berlin() -> LocalZone {
        LocalZone::Named(chrono_tz::Europe::Berlin)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn today_in_utc() {
        let clock = At(Utc.with_ymd_and_hms(2025, 6, 15, 13, 45, 0).unwrap());
        let bounds = clock.today(LocalZone::utc());
        assert_eq!(bounds.start, Utc.with_ymd_and_hms(2025, 6, 15, 0, 0, 0).unwrap());
        assert_eq!(bounds.end, Utc.with_ymd_and_hms(2025, 6, 16, 0, 0, 0).unwrap());
    }

    #[test]
    fn today_respects_offset_across_date_line() {
        // 23:30 UTC is already the next day at +02:00.
        let clock = At(Utc.with_ymd_and_hms(2025, 6, 15, 23, 30, 0).unwrap());
        let bounds = clock.today(LocalZone::Fixed(FixedOffset::east_opt(2 * 3600).unwrap()));
        assert_eq!(bounds.start, Utc.with_ymd_and_hms(2025, 6, 15, 22, 0, 0).unwrap());
        assert_eq!(bounds.end, Utc.with_ymd_and_hms(2025, 6, 16, 22, 0, 0).unwrap());
    }

    #[test]
    fn contains_is_half_open() {
        let zone = LocalZone::Fixed(FixedOffset::west_opt(5 * 3600).unwrap());
        let bounds = DayBounds::of(date(2025, 1, 1), zone);
        assert!(bounds.contains(bounds.start));
        assert!(!bounds.contains(bounds.end));
        assert!(bounds.contains(bounds.end - Duration::seconds(1)));
    }

    #[test]
    fn named_zone_uses_the_offset_of_each_date() {
        // Summer time (+02:00) in October, winter time (+01:00) in December.
        assert_eq!(
            DayBounds::of(date(2026, 10, 18), berlin()).start,
            Utc.with_ymd_and_hms(2026, 10, 17, 22, 0, 0).unwrap()
        );
        assert_eq!(
            DayBounds::of(date(2026, 12, 1), berlin()).start,
            Utc.with_ymd_and_hms(2026, 11, 30, 23, 0, 0).unwrap()
        );
    }

    #[test]
    fn clock_change_days_are_not_24_hours() {
        let spring = DayBounds::of(date(2026, 3, 29), berlin());
        let autumn = DayBounds::of(date(2026, 10, 25), berlin());
        assert_eq!(spring.end - spring.start, Duration::hours(23));
        assert_eq!(autumn.end - autumn.start, Duration::hours(25));
    }

    #[test]
    fn skipped_and_repeated_times_resolve() {
        // 02:30 does not exist on 2026-03-29 in Berlin; it reads as 03:30 (+02:00).
        let skipped = date(2026, 3, 29).and_hms_opt(2, 30, 0).unwrap();
        assert_eq!(
            berlin().resolve(skipped),
            Utc.with_ymd_and_hms(2026, 3, 29, 1, 30, 0).unwrap()
        );
        // 02:30 happens twice on 2026-10-25; the first is still at +02:00.
        let repeated = date(2026, 10, 25).and_hms_opt(2, 30, 0).unwrap();
        assert_eq!(
            berlin().resolve(repeated),
            Utc.with_ymd_and_hms(2026, 10, 25, 0, 30, 0).unwrap()
        );
    }
}
