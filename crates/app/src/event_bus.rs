//! In-process device event bus backed by a tokio broadcast channel.

use tokio::sync::broadcast;

use homerules_domain::device::DeviceEvent;

use crate::ports::DeviceEventPublisher;

/// In-process event bus using a tokio [`broadcast`] channel.
///
/// Publishing succeeds even when there are no active subscribers
/// (the event is simply dropped).
pub struct InProcessEventBus {
    sender: broadcast::Sender<DeviceEvent>,
}

impl InProcessEventBus {
    /// Create a new event bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to device events on this bus.
    ///
    /// Returns a receiver that will get all events published *after*
    /// the subscription is created.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.sender.subscribe()
    }
}

impl DeviceEventPublisher for InProcessEventBus {
    fn publish(&self, event: DeviceEvent) {
        // send fails only when nobody listens
        let _ = self.sender.send(event);
    }
}
