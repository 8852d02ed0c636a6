//! Virtual device implementations: light, switch, motion sensor.
//!
//! Each virtual device holds a fixed [`DeviceId`] so rules written against
//! it keep working across restarts.

mod light;
mod sensor;
mod switch;

pub use light::VirtualLight;
pub use sensor::VirtualSensor;
pub use switch::VirtualSwitch;

use std::sync::{Mutex, MutexGuard, PoisonError};

use homerules_domain::device::{Command, Device};
use homerules_domain::id::DeviceId;

use crate::error::VirtualError;

/// Wrapper enum for the concrete virtual device types.
pub enum VirtualDevice {
    Light(VirtualLight),
    Sensor(VirtualSensor),
    Switch(VirtualSwitch),
}

impl VirtualDevice {
    #[must_use]
    pub fn id(&self) -> DeviceId {
        self.snapshot().id
    }

    /// Current state of the device.
    #[must_use]
    pub fn snapshot(&self) -> Device {
        match self {
            Self::Light(d) => d.snapshot(),
            Self::Sensor(d) => d.snapshot(),
            Self::Switch(d) => d.snapshot(),
        }
    }

    /// Apply a command, returning the resulting snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`VirtualError::ReadOnly`] for devices that cannot be driven.
    pub fn apply(&self, command: &Command) -> Result<Device, VirtualError> {
        match self {
            Self::Light(d) => Ok(d.apply(command)),
            Self::Sensor(d) => Err(VirtualError::ReadOnly(d.snapshot().id.to_string())),
            Self::Switch(d) => Ok(d.apply(command)),
        }
    }

    /// Force the on/off state, as a physical interaction would.
    pub fn set_state(&self, state: bool) -> Device {
        match self {
            Self::Light(d) => d.apply(&Command {
                state: Some(state),
                brightness: None,
            }),
            Self::Sensor(d) => d.detect(state),
            Self::Switch(d) => d.apply(&Command {
                state: Some(state),
                brightness: None,
            }),
        }
    }
}

fn lock(state: &Mutex<Device>) -> MutexGuard<'_, Device> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
