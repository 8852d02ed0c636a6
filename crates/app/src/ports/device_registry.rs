//! Device registry port: read device state and dispatch commands.

use std::future::Future;

use homerules_domain::device::{Command, Device};
use homerules_domain::error::RuleEngineError;
use homerules_domain::id::DeviceId;

/// The external device layer, as seen by the rule engine.
///
/// Device state is owned and written by the device layer; the engine only
/// reads snapshots. No locking is expected around those writes: when two
/// sequences race on the same device, the last write wins.
pub trait DeviceRegistry: Send + Sync + 'static {
    /// Snapshot of a device, `None` for an unknown id. Must not fail.
    fn get_device(&self, id: &DeviceId) -> Option<Device>;

    /// Send `command` to a device.
    ///
    /// The engine spawns this future and never waits for it; errors are
    /// only logged.
    fn command(
        &self,
        id: &DeviceId,
        command: &Command,
    ) -> impl Future<Output = Result<(), RuleEngineError>> + Send;
}
