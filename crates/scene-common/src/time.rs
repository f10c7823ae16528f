//! Hourly archive buckets and time requests.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::{SceneError, SceneResult};

/// One hourly bucket in the archive: (year, day-of-year, hour).
///
/// Ordering follows the fields, so a later bucket always compares greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeKey {
    pub year: i32,
    /// 1-based ordinal day (1..=366)
    pub day_of_year: u32,
    /// Hour of day (0..=23)
    pub hour: u32,
}

impl TimeKey {
    /// Build a key, validating day-of-year against the year's calendar.
    pub fn new(year: i32, day_of_year: u32, hour: u32) -> SceneResult<Self> {
        if hour > 23 {
            return Err(SceneError::InvalidRequest(format!("hour {} out of range", hour)));
        }
        if day_of_year == 0 || day_of_year > days_in_year(year) {
            return Err(SceneError::InvalidRequest(format!(
                "day-of-year {} out of range for {}",
                day_of_year, year
            )));
        }
        Ok(Self {
            year,
            day_of_year,
            hour,
        })
    }

    /// The bucket containing `time`.
    pub fn from_datetime(time: DateTime<Utc>) -> Self {
        Self {
            year: time.year(),
            day_of_year: time.ordinal(),
            hour: time.hour(),
        }
    }

    /// The bucket for a calendar date and hour.
    pub fn from_date_hour(date: NaiveDate, hour: u32) -> SceneResult<Self> {
        if hour > 23 {
            return Err(SceneError::InvalidRequest(format!("hour {} out of range", hour)));
        }
        Ok(Self {
            year: date.year(),
            day_of_year: date.ordinal(),
            hour,
        })
    }

    /// Start of the bucket as a UTC timestamp.
    pub fn start(&self) -> DateTime<Utc> {
        let date = NaiveDate::from_yo_opt(self.year, self.day_of_year)
            .unwrap_or(NaiveDate::MIN);
        let naive = date.and_hms_opt(self.hour, 0, 0).unwrap_or_default();
        Utc.from_utc_datetime(&naive)
    }

    /// The bucket one hour earlier, rolling day and year back as needed.
    pub fn previous(&self) -> Self {
        if self.hour > 0 {
            return Self {
                hour: self.hour - 1,
                ..*self
            };
        }
        if self.day_of_year > 1 {
            return Self {
                day_of_year: self.day_of_year - 1,
                hour: 23,
                ..*self
            };
        }
        let year = self.year - 1;
        Self {
            year,
            day_of_year: days_in_year(year),
            hour: 23,
        }
    }

    /// Archive path component: `YYYY/DDD/HH`.
    pub fn path_component(&self) -> String {
        format!("{}/{:03}/{:02}", self.year, self.day_of_year, self.hour)
    }
}

impl fmt::Display for TimeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:03}T{:02}Z", self.year, self.day_of_year, self.hour)
    }
}

/// Number of days in `year` (365 or 366).
pub fn days_in_year(year: i32) -> u32 {
    if NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
        366
    } else {
        365
    }
}

/// What the caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TimeRequest {
    /// A specific hourly bucket.
    Exact { key: TimeKey },
    /// The most recent bucket with data, searched backwards from `now`.
    Latest { now: DateTime<Utc> },
}

impl TimeRequest {
    pub fn exact(date: NaiveDate, hour: u32) -> SceneResult<Self> {
        Ok(TimeRequest::Exact {
            key: TimeKey::from_date_hour(date, hour)?,
        })
    }

    pub fn latest(now: DateTime<Utc>) -> Self {
        TimeRequest::Latest { now }
    }

    /// The bucket the request starts from.
    pub fn anchor(&self) -> TimeKey {
        match self {
            TimeRequest::Exact { key } => *key,
            TimeRequest::Latest { now } => TimeKey::from_datetime(*now),
        }
    }

    pub fn is_latest(&self) -> bool {
        matches!(self, TimeRequest::Latest { .. })
    }
}
