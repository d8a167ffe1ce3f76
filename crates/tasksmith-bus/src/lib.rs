//! Typed event bus used by the iteration engine to publish progress to
//! zero-or-more observers without ever blocking on a slow subscriber.
//!
//! Built on a [`tokio::sync::broadcast`] channel. `publish` never blocks;
//! broadcast drops the oldest buffered event for a lagging subscriber
//! rather than backing up the publisher, so a slow observer can never stall
//! the engine. Subscribers see events in the order they were published.

mod events;

pub use events::*;

use tasksmith_types::EngineEvent;
use tokio::sync::broadcast;

/// Channel capacity before the broadcast channel starts dropping the
/// oldest unread event for a lagging subscriber.
const CHANNEL_CAPACITY: usize = 2048;

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    /// Publishes an event. Returns immediately regardless of how many (if
    /// any) receivers are currently subscribed. Delivered events preserve
    /// publish order per subscriber, but nothing guarantees every event
    /// reaches every observer.
    pub fn publish(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_without_subscribers_does_not_block_or_error() {
        let bus = EventBus::new();
        bus.publish(iteration_start(1));
    }

    #[tokio::test]
    async fn subscriber_sees_events_in_publish_order() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.publish(iteration_start(1));
        bus.publish(signal_detected("complete", ""));
        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.kind, "iteration.start");
        assert_eq!(second.kind, "signal");
    }
}
