//! Condition: a guard evaluated by `if` / `ifElse` entries.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::id::DeviceId;
use crate::time::TimeWindow;

/// A predicate over live device state or the current time of day.
///
/// A list of conditions is satisfied when every entry holds (logical AND);
/// an empty list is always satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// Requires `device` to currently be in `state`.
    State { device: DeviceId, state: bool },
    /// Requires the current time to fall inside the circular window
    /// `start..=end`, which may wrap past midnight.
    Range { start: String, end: String },
}

impl Condition {
    /// Parsed window of a `range` condition, `None` for `state`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidWindow`] when either bound is malformed.
    pub fn window(&self) -> Result<Option<TimeWindow>, ValidationError> {
        match self {
            Self::State { .. } => Ok(None),
            Self::Range { start, end } => {
                let invalid = || ValidationError::InvalidWindow(format!("{start}-{end}"));
                Ok(Some(TimeWindow {
                    start: start.parse().map_err(|_| invalid())?,
                    end: end.parse().map_err(|_| invalid())?,
                }))
            }
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::State { device, state } => write!(f, "state({device}={state})"),
            Self::Range { start, end } => write!(f, "range({start}-{end})"),
        }
    }
}
