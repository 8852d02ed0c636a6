//! Virtual switch: plain on/off outlet.

use std::sync::Mutex;

use homerules_domain::device::{Command, Device};

use super::lock;

/// A simulated outlet that can be turned on and off.
pub struct VirtualSwitch {
    state: Mutex<Device>,
}

impl Default for VirtualSwitch {
    fn default() -> Self {
        Self {
            state: Mutex::new(Device::switch("virtual_switch", false)),
        }
    }
}

impl VirtualSwitch {
    #[must_use]
    pub fn snapshot(&self) -> Device {
        lock(&self.state).clone()
    }

    /// Apply the `state` of a command; brightness is ignored.
    pub fn apply(&self, command: &Command) -> Device {
        let mut device = lock(&self.state);
        if let Some(state) = command.state {
            device.state = state;
        }
        device.clone()
    }
}
