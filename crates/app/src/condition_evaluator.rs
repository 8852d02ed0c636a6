//! Condition evaluator: guards of `if` / `ifElse` entries.

use chrono::{DateTime, TimeZone};
use homerules_domain::rule::Condition;
use homerules_domain::sun::SunTimes;
use tracing::{debug, warn};

use crate::ports::DeviceRegistry;

/// Whether every condition holds (logical AND). An empty list holds.
///
/// - `state` compares the device's current state; an unknown device fails.
/// - `range` tests `now` against a circular window with minute precision;
///   a malformed window fails with a warning.
pub fn evaluate<D, Tz>(
    conditions: &[Condition],
    devices: &D,
    now: &DateTime<Tz>,
    sun: Option<&SunTimes>,
) -> bool
where
    D: DeviceRegistry,
    Tz: TimeZone,
{
    conditions
        .iter()
        .all(|condition| holds(condition, devices, now, sun))
}

fn holds<D, Tz>(
    condition: &Condition,
    devices: &D,
    now: &DateTime<Tz>,
    sun: Option<&SunTimes>,
) -> bool
where
    D: DeviceRegistry,
    Tz: TimeZone,
{
    match condition {
        Condition::State { device, state } => match devices.get_device(device) {
            Some(found) => found.state == *state,
            None => {
                debug!(device = %device, "condition references unknown device");
                false
            }
        },
        Condition::Range { .. } => match condition.window() {
            Ok(Some(window)) => window.contains(now, sun),
            Ok(None) => false,
            Err(err) => {
                warn!(condition = %condition, error = %err, "malformed range condition");
                false
            }
        },
    }
}
