//! Virtual motion sensor: reports state, never accepts commands.

use std::sync::Mutex;

use homerules_domain::device::Device;

use super::lock;

/// A simulated motion sensor.
pub struct VirtualSensor {
    state: Mutex<Device>,
}

impl Default for VirtualSensor {
    fn default() -> Self {
        Self {
            state: Mutex::new(Device {
                id: "virtual_motion".into(),
                name: "Virtual Motion Sensor".to_string(),
                kind: "sensor".to_string(),
                state: false,
                brightness: None,
            }),
        }
    }
}

impl VirtualSensor {
    #[must_use]
    pub fn snapshot(&self) -> Device {
        lock(&self.state).clone()
    }

    /// Record motion (`true`) or its end (`false`).
    pub fn detect(&self, motion: bool) -> Device {
        let mut device = lock(&self.state);
        device.state = motion;
        device.clone()
    }
}
