//! In-process event bus backed by a tokio broadcast channel.

use tokio::sync::broadcast;

use hmbridge_domain::event::EntityEvent;

use crate::entity::{EventCallback, callback};

/// Fan-out of entity events to async consumers.
///
/// Publishing succeeds even when there are no active subscribers
/// (the event is simply dropped).
#[derive(Clone)]
pub struct InProcessEventBus {
    sender: broadcast::Sender<EntityEvent>,
}

impl InProcessEventBus {
    /// Create a new event bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events on this bus.
    ///
    /// Returns a receiver that will get all events published *after*
    /// the subscription is created.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EntityEvent> {
        self.sender.subscribe()
    }

    /// Publish `event`, returning how many subscribers will see it.
    pub fn publish(&self, event: EntityEvent) -> usize {
        // only fails when nobody listens
        self.sender.send(event).unwrap_or(0)
    }

    /// Entity callback forwarding every event into this bus.
    #[must_use]
    pub fn callback(&self) -> EventCallback {
        let sender = self.sender.clone();
        callback(move |event| {
            let _ = sender.send(event.clone());
            Ok(())
        })
    }
}
