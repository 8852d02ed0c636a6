//! Device: the engine's read-only view of something in the external device layer.
//!
//! The engine never talks to hardware. It reads [`Device`] snapshots,
//! receives [`DeviceEvent`]s and emits [`Command`]s through the
//! `DeviceRegistry` port.

use serde::{Deserialize, Serialize};

use crate::id::DeviceId;

/// Current state snapshot of a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    /// Free-form kind reported by the device layer (`outlet`, `dimmer`, …).
    #[serde(rename = "type", default)]
    pub kind: String,
    pub state: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<u16>,
}

impl Device {
    /// A minimal on/off device, handy for hosts and tests.
    #[must_use]
    pub fn switch(id: impl Into<DeviceId>, state: bool) -> Self {
        let id = id.into();
        Self {
            name: id.to_string(),
            id,
            kind: "outlet".to_string(),
            state,
            brightness: None,
        }
    }
}

/// A state change reported by the device layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEvent {
    pub device_id: DeviceId,
    pub state: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<u16>,
}

/// Fields sent to a device. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<u16>,
}

impl Command {
    #[must_use]
    pub fn turn_on() -> Self {
        Self {
            state: Some(true),
            brightness: None,
        }
    }

    #[must_use]
    pub fn turn_off() -> Self {
        Self {
            state: Some(false),
            brightness: None,
        }
    }

    #[must_use]
    pub fn with_brightness(mut self, brightness: u16) -> Self {
        self.brightness = Some(brightness);
        self
    }

    /// Apply this command to a snapshot, as a device layer would.
    pub fn apply_to(&self, device: &mut Device) {
        if let Some(state) = self.state {
            device.state = state;
        }
        if let Some(brightness) = self.brightness {
            device.brightness = Some(brightness);
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.state, self.brightness) {
            (Some(state), Some(b)) => write!(f, "state={state} brightness={b}"),
            (Some(state), None) => write!(f, "state={state}"),
            (None, Some(b)) => write!(f, "brightness={b}"),
            (None, None) => f.write_str("noop"),
        }
    }
}
