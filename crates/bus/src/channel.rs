//! In-process event bus on a tokio broadcast channel

use tokio::sync::broadcast;

use crate::event::GuardianEvent;

/// Default channel capacity per subscriber
pub const DEFAULT_CAPACITY: usize = 256;

/// Sink for committed-state events
///
/// Publishing is fire-and-forget: the state change is already durable when
/// an event is emitted, so a missing listener is never an error.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: GuardianEvent);
}

/// Event bus for distributing committed events
pub struct EventBus {
    sender: broadcast::Sender<GuardianEvent>,
}

impl EventBus {
    /// Create a new event bus; slow subscribers lag after `capacity` events
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Receive every event published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<GuardianEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventPublisher for EventBus {
    fn publish(&self, event: GuardianEvent) {
        let kind = event.kind();
        match self.sender.send(event) {
            Ok(receivers) => tracing::debug!(kind, receivers, "Event published"),
            Err(_) => tracing::trace!(kind, "Event dropped, no subscribers"),
        }
    }
}
