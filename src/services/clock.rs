use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::errors::AppError;

pub trait Clock: Send + Sync {
    /// Wall-clock time in the server's local zone.
    fn now(&self) -> NaiveDateTime;

    fn now_utc(&self) -> DateTime<Utc>;

    /// Wall-clock time as seen by a caller in `zone`. Falls back to server
    /// local time when the caller did not say.
    fn now_in(&self, zone: Option<Tz>) -> NaiveDateTime {
        match zone {
            Some(tz) => self.now_utc().with_timezone(&tz).naive_local(),
            None => self.now(),
        }
    }
}

pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A stopped clock whose server zone is UTC.
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }

    fn now_utc(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.0)
    }
}

/// Parses an IANA zone name such as `Europe/Berlin` or `UTC`.
pub fn parse_zone(raw: &str) -> Result<Tz, AppError> {
    raw.trim()
        .parse::<Tz>()
        .map_err(|_| AppError::Validation(format!("unknown time zone: {raw}")))
}

/// Like [`parse_zone`] but treats a missing or blank value as "server local".
pub fn optional_zone(raw: Option<&str>) -> Result<Option<Tz>, AppError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(name) => parse_zone(name).map(Some),
    }
}
