//! Time-of-day arithmetic.
//!
//! Rules reason about wall-clock minutes, not instants: a trigger window
//! such as `22:00-06:00` is a circular range over the 24 hour dial and may
//! wrap past midnight. Seconds are truncated everywhere, so `20:00:59`
//! still counts as `20:00`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::sun::SunTimes;

/// UTC timestamp used for sun times.
pub type Timestamp = DateTime<Utc>;

const MINUTES_PER_DAY: u16 = 24 * 60;

/// A wall-clock time with minute precision, `00:00` through `24:00`.
///
/// `24:00` only exists so that a window can end at the very end of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub const MIDNIGHT: Self = Self(0);
    pub const END_OF_DAY: Self = Self(MINUTES_PER_DAY);

    /// Build from hour and minute. `24:00` is accepted, nothing later.
    #[must_use]
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        if minute >= 60 || hour > 24 || (hour == 24 && minute > 0) {
            return None;
        }
        u16::try_from(hour * 60 + minute).ok().map(Self)
    }

    /// Wall-clock time of `instant` in its own time zone, seconds truncated.
    #[must_use]
    pub fn of<Tz: TimeZone>(instant: &DateTime<Tz>) -> Self {
        Self::from_naive(instant.time())
    }

    #[must_use]
    pub fn from_naive(time: NaiveTime) -> Self {
        // hour < 24 and minute < 60, always fits
        Self::new(time.hour(), time.minute()).unwrap_or(Self::MIDNIGHT)
    }

    /// The matching [`NaiveTime`], or `None` for `24:00`.
    #[must_use]
    pub fn to_naive(self) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(u32::from(self.hour()), u32::from(self.minute()), 0)
    }

    #[must_use]
    pub fn hour(self) -> u16 {
        self.0 / 60
    }

    #[must_use]
    pub fn minute(self) -> u16 {
        self.0 % 60
    }

    #[must_use]
    pub fn minutes_since_midnight(self) -> u16 {
        self.0
    }
}

impl FromStr for TimeOfDay {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidTime(s.to_string());
        let (hour, minute) = s.trim().split_once(':').ok_or_else(invalid)?;
        if hour.is_empty() || hour.len() > 2 || minute.len() != 2 {
            return Err(invalid());
        }
        let hour = hour.parse().map_err(|_| invalid())?;
        let minute = minute.parse().map_err(|_| invalid())?;
        Self::new(hour, minute).ok_or_else(invalid)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

/// Circular membership test over the 24 hour dial.
///
/// - `start < end`: `start <= now <= end`
/// - `start > end` (wraps midnight): `now >= start || now <= end`
/// - `start == end`: never matches
#[must_use]
pub fn in_circular_window(start: TimeOfDay, end: TimeOfDay, now: TimeOfDay) -> bool {
    if start < end {
        start <= now && now <= end
    } else if start > end {
        now >= start || now <= end
    } else {
        false
    }
}

/// One end of a [`TimeWindow`]: a fixed clock time or today's sunrise/sunset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBound {
    At(TimeOfDay),
    Sunrise,
    Sunset,
}

impl TimeBound {
    /// Resolve to a wall-clock time in `tz`.
    ///
    /// Returns `None` for `sunrise`/`sunset` while no sun times are known.
    #[must_use]
    pub fn resolve<Tz: TimeZone>(self, sun: Option<&SunTimes>, tz: &Tz) -> Option<TimeOfDay> {
        match self {
            Self::At(time) => Some(time),
            Self::Sunrise => sun.map(|s| TimeOfDay::of(&s.sunrise.with_timezone(tz))),
            Self::Sunset => sun.map(|s| TimeOfDay::of(&s.sunset.with_timezone(tz))),
        }
    }
}

impl FromStr for TimeBound {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sunrise" => Ok(Self::Sunrise),
            "sunset" => Ok(Self::Sunset),
            other => other.parse().map(Self::At),
        }
    }
}

impl fmt::Display for TimeBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::At(time) => time.fmt(f),
            Self::Sunrise => f.write_str("sunrise"),
            Self::Sunset => f.write_str("sunset"),
        }
    }
}

/// A circular `START-END` window, e.g. `"08:00-20:00"`, `"22:00 - 06:00"`
/// or `"sunset-23:30"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeWindow {
    pub start: TimeBound,
    pub end: TimeBound,
}

impl TimeWindow {
    /// `00:00-24:00`, the window of a device trigger with no explicit time.
    pub const ALL_DAY: Self = Self {
        start: TimeBound::At(TimeOfDay::MIDNIGHT),
        end: TimeBound::At(TimeOfDay::END_OF_DAY),
    };

    /// Whether `now` falls inside the window.
    ///
    /// A bound that cannot be resolved (sun keyword without sun times)
    /// makes the window not match.
    #[must_use]
    pub fn contains<Tz: TimeZone>(&self, now: &DateTime<Tz>, sun: Option<&SunTimes>) -> bool {
        let tz = now.timezone();
        match (self.start.resolve(sun, &tz), self.end.resolve(sun, &tz)) {
            (Some(start), Some(end)) => in_circular_window(start, end, TimeOfDay::of(now)),
            _ => false,
        }
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self::ALL_DAY
    }
}

impl FromStr for TimeWindow {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        let invalid = || ValidationError::InvalidWindow(s.to_string());
        let (start, end) = compact.split_once('-').ok_or_else(invalid)?;
        Ok(Self {
            start: start.parse().map_err(|_| invalid())?,
            end: end.parse().map_err(|_| invalid())?,
        })
    }
}

impl TryFrom<String> for TimeWindow {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeWindow> for String {
    fn from(value: TimeWindow) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}
