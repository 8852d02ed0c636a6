//! Virtual light: dimmable, responds to `state` and `brightness`.

use std::sync::Mutex;

use homerules_domain::device::{Command, Device};

use super::lock;

/// Brightness a light comes back on with when none is given.
const DEFAULT_BRIGHTNESS: u16 = 100;

/// A simulated dimmable light.
pub struct VirtualLight {
    state: Mutex<Device>,
}

impl Default for VirtualLight {
    fn default() -> Self {
        Self {
            state: Mutex::new(Device {
                id: "virtual_light".into(),
                name: "Virtual Light".to_string(),
                kind: "dimmer".to_string(),
                state: false,
                brightness: Some(DEFAULT_BRIGHTNESS),
            }),
        }
    }
}

impl VirtualLight {
    #[must_use]
    pub fn snapshot(&self) -> Device {
        lock(&self.state).clone()
    }

    /// Apply a command; brightness is clamped to `0..=100`.
    pub fn apply(&self, command: &Command) -> Device {
        let mut device = lock(&self.state);
        let command = Command {
            state: command.state,
            brightness: command.brightness.map(|b| b.min(100)),
        };
        command.apply_to(&mut device);
        device.clone()
    }
}
