//! Simulation Calendar Types
//!
//! Simulated time is a plain calendar date. Ages and life stages are derived
//! from the distance between a birth date and the current date.
//!
//! # Example
//!
//! ```
//! use life_events::SimDate;
//!
//! let born: SimDate = "1990-01-01".parse().unwrap();
//! let later = born.add_days(365);
//! assert_eq!(later.to_string(), "1991-01-01");
//! assert_eq!(later.whole_years_since(born), 1);
//! ```

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Average days per calendar year, used to pro-rate yearly rates.
pub const DAYS_PER_YEAR: f32 = 365.25;

/// Serialized date format.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// A simulated calendar day.
///
/// Serializes to strings like "1990-01-01".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimDate(NaiveDate);

impl SimDate {
    /// Creates a date from year, month and day.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self, ParseDateError> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(SimDate)
            .ok_or_else(|| ParseDateError::OutOfRange(format!("{:04}-{:02}-{:02}", year, month, day)))
    }

    /// Wraps an existing chrono date.
    pub fn from_naive(date: NaiveDate) -> Self {
        SimDate(date)
    }

    /// Returns the underlying chrono date.
    pub fn as_naive(&self) -> NaiveDate {
        self.0
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }

    /// Returns the date `days` later, saturating at the end of the calendar.
    pub fn add_days(self, days: u32) -> Self {
        SimDate(
            self.0
                .checked_add_days(Days::new(u64::from(days)))
                .unwrap_or(NaiveDate::MAX),
        )
    }

    /// Signed number of days from `earlier` to `self`.
    pub fn days_since(self, earlier: SimDate) -> i64 {
        self.0.signed_duration_since(earlier.0).num_days()
    }

    /// Whole calendar years elapsed since `birth` (0 if `self` precedes it).
    pub fn whole_years_since(self, birth: SimDate) -> u32 {
        if self <= birth {
            return 0;
        }
        let mut years = self.year() - birth.year();
        if (self.month(), self.day()) < (birth.month(), birth.day()) {
            years -= 1;
        }
        years.max(0) as u32
    }
}

impl fmt::Display for SimDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

/// Error type for parsing SimDate from strings.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseDateError {
    #[error("invalid date format: '{0}', expected 'YYYY-MM-DD'")]
    InvalidFormat(String),
    #[error("date out of range: '{0}'")]
    OutOfRange(String),
}

impl FromStr for SimDate {
    type Err = ParseDateError;

    /// Parses a SimDate from a string like "1990-01-01".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
            .map(SimDate)
            .map_err(|_| ParseDateError::InvalidFormat(s.to_string()))
    }
}

// Custom serialization for SimDate - serialize as a string
impl Serialize for SimDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for SimDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
