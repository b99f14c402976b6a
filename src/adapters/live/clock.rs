//! System clock.

use chrono::{DateTime, Utc};

use crate::ports::clock::Clock;

/// Clock reading the operating system's wall time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    use crate::ports::LocalZone;

    #[test]
    fn today_contains_now() {
        let offset = LocalZone::Fixed(FixedOffset::east_opt(5 * 3600 + 1800).unwrap());
        for zone in [offset, LocalZone::System, LocalZone::Named(chrono_tz::America::New_York)] {
            assert!(SystemClock.today(zone).contains(SystemClock.now()));
        }
    }
}
