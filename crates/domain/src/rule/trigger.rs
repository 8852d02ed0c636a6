//! Trigger: what autonomously starts a rule's sequence.

use chrono::{NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::id::DeviceId;
use crate::sun::SunEvent;
use crate::time::{TimeOfDay, TimeWindow};

/// Describes when a rule should fire.
///
/// Time strings are kept as authored; they are parsed when the rule is
/// scheduled so that one malformed rule can be skipped on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    /// Fires when `device` reports `state`, if the change happens inside `time`.
    Device {
        device: DeviceId,
        state: bool,
        /// Window such as `"08:00-20:00"`; the whole day when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time: Option<String>,
    },
    /// Fires once a day at `HH:MM` local time.
    Time { time: String },
    /// Fires `offset` seconds after (or before, if negative) sunrise.
    Sunrise {
        #[serde(default)]
        offset: i64,
    },
    /// Fires `offset` seconds after (or before, if negative) sunset.
    Sunset {
        #[serde(default)]
        offset: i64,
    },
}

/// When a timer-driven trigger should fire today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Today at this local wall-clock time.
    At(NaiveTime),
    /// Today's sun event shifted by `offset`.
    Sun { event: SunEvent, offset: TimeDelta },
}

impl Trigger {
    /// Timer schedule of this trigger, `None` for device triggers.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidTime`] when a `time` trigger does
    /// not hold a valid `HH:MM` (`24:00` is not a firing time), or
    /// [`ValidationError::InvalidOffset`] for an out-of-range sun offset.
    pub fn schedule(&self) -> Result<Option<Schedule>, ValidationError> {
        match self {
            Self::Device { .. } => Ok(None),
            Self::Time { time } => time
                .parse::<TimeOfDay>()?
                .to_naive()
                .map(|t| Some(Schedule::At(t)))
                .ok_or_else(|| ValidationError::InvalidTime(time.clone())),
            Self::Sunrise { offset } => Ok(Some(Schedule::Sun {
                event: SunEvent::Sunrise,
                offset: sun_offset(*offset)?,
            })),
            Self::Sunset { offset } => Ok(Some(Schedule::Sun {
                event: SunEvent::Sunset,
                offset: sun_offset(*offset)?,
            })),
        }
    }

    /// Window of a device trigger, [`TimeWindow::ALL_DAY`] when unset.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidWindow`] when the window is malformed.
    pub fn window(&self) -> Result<TimeWindow, ValidationError> {
        match self {
            Self::Device {
                time: Some(time), ..
            } => time.parse(),
            _ => Ok(TimeWindow::ALL_DAY),
        }
    }

    /// Whether this trigger reacts to `device` entering `state`.
    #[must_use]
    pub fn matches_device(&self, device: &DeviceId, state: bool) -> bool {
        matches!(self, Self::Device { device: d, state: s, .. } if d == device && *s == state)
    }

    /// Parse every time string the trigger carries.
    ///
    /// # Errors
    ///
    /// Returns the first parse failure.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.schedule()?;
        self.window()?;
        Ok(())
    }
}

/// Largest sun offset accepted, one day either side of the event.
pub const MAX_SUN_OFFSET_SECS: i64 = 24 * 60 * 60;

fn sun_offset(seconds: i64) -> Result<TimeDelta, ValidationError> {
    if seconds.unsigned_abs() > MAX_SUN_OFFSET_SECS.unsigned_abs() {
        return Err(ValidationError::InvalidOffset(seconds));
    }
    TimeDelta::try_seconds(seconds).ok_or(ValidationError::InvalidOffset(seconds))
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Device {
                device,
                state,
                time,
            } => write!(
                f,
                "device({device}={state}, {})",
                time.as_deref().unwrap_or("00:00-24:00")
            ),
            Self::Time { time } => write!(f, "time({time})"),
            Self::Sunrise { offset } => write!(f, "sunrise({offset:+}s)"),
            Self::Sunset { offset } => write!(f, "sunset({offset:+}s)"),
        }
    }
}
