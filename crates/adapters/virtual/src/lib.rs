//! # homerules-adapter-virtual
//!
//! Virtual device layer that provides simulated devices for trying rules
//! without hardware.
//!
//! ## Provided devices
//!
//! | Device | Device ID | Behaviour |
//! |--------|-----------|-----------|
//! | Virtual Light | `virtual_light` | Dimmer, responds to `state` and `brightness` |
//! | Virtual Switch | `virtual_switch` | Outlet, responds to `state` |
//! | Virtual Motion Sensor | `virtual_motion` | Read-only, driven by [`VirtualDevices::simulate`] |
//!
//! Every state change, commanded or simulated, is published as a
//! [`DeviceEvent`] so device-triggered rules can react to it. `homerulesd`
//! drives [`VirtualDevices::simulate`] from `<device> on|off` lines on stdin.
//!
//! ## Dependency rule
//!
//! Depends on `homerules-app` (port traits) and `homerules-domain` only.

mod devices;
mod error;

pub use error::VirtualError;

use std::collections::HashMap;
use std::future::Future;

use homerules_app::ports::{DeviceEventPublisher, DeviceRegistry};
use homerules_domain::device::{Command, Device, DeviceEvent};
use homerules_domain::error::RuleEngineError;
use homerules_domain::id::DeviceId;
use tracing::{debug, info};

use devices::{VirtualDevice, VirtualLight, VirtualSensor, VirtualSwitch};

/// Simulated device layer implementing [`DeviceRegistry`].
pub struct VirtualDevices<P> {
    devices: HashMap<DeviceId, VirtualDevice>,
    publisher: P,
}

impl<P: DeviceEventPublisher> VirtualDevices<P> {
    /// Create the default light, switch and sensor, publishing to `publisher`.
    pub fn new(publisher: P) -> Self {
        let devices = [
            VirtualDevice::Light(VirtualLight::default()),
            VirtualDevice::Sensor(VirtualSensor::default()),
            VirtualDevice::Switch(VirtualSwitch::default()),
        ]
        .into_iter()
        .map(|device| (device.id(), device))
        .collect();
        Self { devices, publisher }
    }

    /// Snapshots of every simulated device.
    #[must_use]
    pub fn list(&self) -> Vec<Device> {
        let mut devices: Vec<Device> = self.devices.values().map(VirtualDevice::snapshot).collect();
        devices.sort_by(|a, b| a.id.cmp(&b.id));
        devices
    }

    /// Simulate a physical state change (motion, a wall switch, …) and
    /// publish it.
    ///
    /// # Errors
    ///
    /// Returns [`VirtualError::UnknownDevice`] if no device has this id.
    pub fn simulate(&self, id: &DeviceId, state: bool) -> Result<Device, VirtualError> {
        let device = self
            .devices
            .get(id)
            .ok_or_else(|| VirtualError::UnknownDevice(id.to_string()))?;
        let before = device.snapshot();
        let after = device.set_state(state);
        info!(device = %id, state, "simulated state change");
        self.notify(&before, &after);
        Ok(after)
    }

    fn apply(&self, id: &DeviceId, command: &Command) -> Result<Device, VirtualError> {
        let device = self
            .devices
            .get(id)
            .ok_or_else(|| VirtualError::UnknownDevice(id.to_string()))?;
        let before = device.snapshot();
        let after = device.apply(command)?;
        debug!(device = %id, command = %command, "virtual device commanded");
        self.notify(&before, &after);
        Ok(after)
    }

    fn notify(&self, before: &Device, after: &Device) {
        if before.state != after.state || before.brightness != after.brightness {
            self.publisher.publish(DeviceEvent {
                device_id: after.id.clone(),
                state: after.state,
                brightness: after.brightness,
            });
        }
    }
}

impl<P: DeviceEventPublisher + 'static> DeviceRegistry for VirtualDevices<P> {
    fn get_device(&self, id: &DeviceId) -> Option<Device> {
        self.devices.get(id).map(VirtualDevice::snapshot)
    }

    fn command(
        &self,
        id: &DeviceId,
        command: &Command,
    ) -> impl Future<Output = Result<(), RuleEngineError>> + Send {
        let result = self
            .apply(id, command)
            .map(drop)
            .map_err(VirtualError::into_domain);
        async { result }
    }
}
