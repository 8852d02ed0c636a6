//! Device event publisher port.

use std::sync::Arc;

use homerules_domain::device::DeviceEvent;

/// Publishes device state changes to whoever listens (the rule engine).
pub trait DeviceEventPublisher: Send + Sync {
    /// Publish an event. Publishing with no listener is not an error.
    fn publish(&self, event: DeviceEvent);
}

impl<P: DeviceEventPublisher + ?Sized> DeviceEventPublisher for Arc<P> {
    fn publish(&self, event: DeviceEvent) {
        (**self).publish(event);
    }
}
