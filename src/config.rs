//! Runtime configuration from the environment.
//!
//! A `.env` file in the working directory is loaded first (variables already
//! set in the environment win), then the `TASKDECK_*` variables are read.

use std::path::PathBuf;
use std::time::Duration;

use chrono::FixedOffset;
use chrono_tz::Tz;

use crate::error::TaskError;
use crate::ports::LocalZone;

/// Backend project URL.
pub const URL_ENV: &str = "TASKDECK_URL";
/// Backend anon (public) API key.
pub const ANON_KEY_ENV: &str = "TASKDECK_ANON_KEY";
/// Where the signed-in session is kept.
pub const SESSION_FILE_ENV: &str = "TASKDECK_SESSION_FILE";
/// Fixed UTC offset used for "today" and for due date entry.
pub const UTC_OFFSET_ENV: &str = "TASKDECK_UTC_OFFSET";
/// Named time zone (`Europe/Berlin`) used when no fixed offset is set.
pub const TIMEZONE_ENV: &str = "TASKDECK_TIMEZONE";
/// Seconds between change polls while watching.
pub const POLL_SECS_ENV: &str = "TASKDECK_POLL_SECS";
/// Directory to record cassettes into.
pub const RECORD_ENV: &str = "TASKDECK_RECORD";

const DEFAULT_SESSION_FILE: &str = ".taskdeck/session.yaml";
const DEFAULT_POLL_SECS: u64 = 5;

/// Settings for one CLI run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Backend project URL, required for anything that talks to the backend.
    pub url: Option<String>,
    /// Backend anon key, required alongside `url`.
    pub anon_key: Option<String>,
    /// Persisted session location.
    pub session_file: PathBuf,
    /// Local zone for day boundaries and date entry.
    pub zone: LocalZone,
    /// Change feed polling interval.
    pub poll_interval: Duration,
    /// Cassette directory when recording.
    pub record_dir: Option<PathBuf>,
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Config`] if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, TaskError> {
        // A missing .env is the normal case.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Config`] if a variable is set to an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, TaskError> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let zone = match (var(UTC_OFFSET_ENV), var(TIMEZONE_ENV)) {
            (Some(raw), _) => LocalZone::Fixed(parse_offset(&raw)?),
            (None, Some(name)) => LocalZone::Named(parse_zone(&name)?),
            (None, None) => LocalZone::System,
        };
        let poll_secs = match var(POLL_SECS_ENV) {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| {
                    TaskError::Config(format!(
                        "{POLL_SECS_ENV} must be a positive integer, got {raw:?}"
                    ))
                })?,
            None => DEFAULT_POLL_SECS,
        };

        Ok(Self {
            url: var(URL_ENV),
            anon_key: var(ANON_KEY_ENV),
            session_file: var(SESSION_FILE_ENV)
                .map_or_else(|| PathBuf::from(DEFAULT_SESSION_FILE), PathBuf::from),
            zone,
            poll_interval: Duration::from_secs(poll_secs),
            record_dir: var(RECORD_ENV).map(PathBuf::from),
        })
    }

    /// Backend URL and anon key.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Config`] naming the first missing variable.
    pub fn backend(&self) -> Result<(&str, &str), TaskError> {
        let missing = |key: &str| TaskError::Config(format!("{key} is not set"));
        let url = self.url.as_deref().ok_or_else(|| missing(URL_ENV))?;
        let key = self.anon_key.as_deref().ok_or_else(|| missing(ANON_KEY_ENV))?;
        Ok((url, key))
    }
}

/// Parses a zone name from the tz database.
///
/// # Errors
///
/// Returns [`TaskError::Config`] for an unknown name.
pub fn parse_zone(raw: &str) -> Result<Tz, TaskError> {
    raw.parse::<Tz>().map_err(|_| {
        TaskError::Config(format!(
            "{TIMEZONE_ENV} must name a zone like Europe/Berlin, got {raw:?}"
        ))
    })
}

/// Parses `+HH:MM`, `-HH:MM`, `+HH`, `Z` or `UTC`.
///
/// # Errors
///
/// Returns [`TaskError::Config`] if the text is not an offset within a day.
pub fn parse_offset(raw: &str) -> Result<FixedOffset, TaskError> {
    let invalid =
        || TaskError::Config(format!("{UTC_OFFSET_ENV} must look like +05:30, got {raw:?}"));
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }
    let (sign, rest) = match raw.as_bytes().first() {
        Some(b'+') => (1, &raw[1..]),
        Some(b'-') => (-1, &raw[1..]),
        _ => return Err(invalid()),
    };
    let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if !(0..60).contains(&minutes) {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, TaskError> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config(&[(UTC_OFFSET_ENV, "+00:00")]).unwrap();
        assert_eq!(config.session_file, PathBuf::from(".taskdeck/session.yaml"));
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert!(config.record_dir.is_none());
        assert!(matches!(config.backend(), Err(TaskError::Config(msg)) if msg.contains(URL_ENV)));
    }

    #[test]
    fn reads_backend_settings() {
        let config = config(&[
            (URL_ENV, "https://project.example.co"),
            (ANON_KEY_ENV, "anon"),
            (POLL_SECS_ENV, "2"),
            (RECORD_ENV, "cassettes/run1"),
        ])
        .unwrap();
        assert_eq!(config.backend().unwrap(), ("https://project.example.co", "anon"));
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.record_dir, Some(PathBuf::from("cassettes/run1")));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = config(&[(URL_ENV, "  "), (UTC_OFFSET_ENV, "Z")]).unwrap();
        assert!(config.url.is_none());
    }

    #[test]
    fn rejects_bad_poll_interval() {
        assert!(config(&[(POLL_SECS_ENV, "0")]).is_err());
        assert!(config(&[(POLL_SECS_ENV, "soon")]).is_err());
    }

    #[test]
    fn zone_defaults_to_the_system_zone() {
        assert_eq!(config(&[]).unwrap().zone, LocalZone::System);
    }

    #[test]
    fn named_zone_and_fixed_offset_override() {
        let named = config(&[(TIMEZONE_ENV, "Europe/Berlin")]).unwrap();
        assert_eq!(named.zone, LocalZone::Named(chrono_tz::Europe::Berlin));

        let fixed = config(&[(TIMEZONE_ENV, "Europe/Berlin"), (UTC_OFFSET_ENV, "+05:30")]).unwrap();
        assert_eq!(fixed.zone, LocalZone::Fixed(FixedOffset::east_opt(19_800).unwrap()));

        assert!(matches!(
            config(&[(TIMEZONE_ENV, "Mars/Olympus")]),
            Err(TaskError::Config(msg)) if msg.contains(TIMEZONE_ENV)
        ));
    }

    #[test]
    fn parses_offsets() {
        assert_eq!(parse_offset("+05:30").unwrap().local_minus_utc(), 19_800);
        assert_eq!(parse_offset("-08:00").unwrap().local_minus_utc(), -28_800);
        assert_eq!(parse_offset("+02").unwrap().local_minus_utc(), 7_200);
        assert_eq!(parse_offset("UTC").unwrap().local_minus_utc(), 0);
        assert!(parse_offset("05:30").is_err());
        assert!(parse_offset("+05:75").is_err());
        assert!(parse_offset("+25:00").is_err());
    }
}
