//! Wall-clock time of day and date ranges.

use chrono::NaiveDate;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;

const MINUTES_PER_DAY: u32 = 24 * 60;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid time of day '{0}', expected HH:MM")]
pub struct TimeParseError(pub String);

/// Minutes after midnight on the club's local clock.
///
/// `24:00` is representable so a range can end at midnight. Serialized as
/// `HH:MM`; `HH:MM:SS` is accepted on input (seconds are dropped).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ToSchema)]
#[schema(value_type = String, example = "08:00")]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay(0);
    pub const END_OF_DAY: TimeOfDay = TimeOfDay(MINUTES_PER_DAY as u16);

    pub fn from_minutes(minutes: u32) -> Option<Self> {
        (minutes <= MINUTES_PER_DAY).then_some(TimeOfDay(minutes as u16))
    }

    pub fn at(hour: u32, minute: u32) -> Option<Self> {
        if minute >= 60 {
            return None;
        }
        Self::from_minutes(hour * 60 + minute)
    }

    pub fn minutes(self) -> u32 {
        self.0 as u32
    }

    pub fn hour(self) -> u32 {
        self.minutes() / 60
    }

    /// Read `self` as the end of a range starting at `start`: an end of
    /// `00:00` that is not after its start means midnight at the close of day.
    pub fn as_end_after(self, start: TimeOfDay) -> Self {
        if self == Self::MIDNIGHT && self <= start {
            Self::END_OF_DAY
        } else {
            self
        }
    }

    /// Add minutes, saturating at `24:00`.
    pub fn add_minutes(self, minutes: u32) -> Self {
        TimeOfDay(self.minutes().saturating_add(minutes).min(MINUTES_PER_DAY) as u16)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.minutes() / 60, self.minutes() % 60)
    }
}

impl FromStr for TimeOfDay {
    type Err = TimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || TimeParseError(s.to_string());
        let mut parts = s.trim().split(':');
        let (Some(h), Some(m)) = (parts.next(), parts.next()) else {
            return Err(err());
        };
        if let Some(sec) = parts.next() {
            if sec.len() != 2 || sec.parse::<u32>().map_or(true, |v| v >= 60) {
                return Err(err());
            }
        }
        if parts.next().is_some() || h.len() != 2 || m.len() != 2 {
            return Err(err());
        }

        let hour: u32 = h.parse().map_err(|_| err())?;
        let minute: u32 = m.parse().map_err(|_| err())?;
        if hour == 24 && minute != 0 {
            return Err(err());
        }
        TimeOfDay::at(hour, minute).ok_or_else(err)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    pub fn single(date: NaiveDate) -> Self {
        Self { from: date, to: date }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}
