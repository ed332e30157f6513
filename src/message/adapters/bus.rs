//! Broadcast-channel implementation of the `ChangeNotifier` port.
//!
//! A single-process publish/subscribe bus over
//! [`tokio::sync::broadcast`]. Publication never blocks and never fails
//! from the store's perspective: with no subscribers the event is simply
//! dropped, and a lagging subscriber loses old events rather than
//! stalling the publisher.

use tokio::sync::broadcast;

use crate::message::{domain::StoreEvent, ports::notifier::ChangeNotifier};

/// A broadcast-backed change notifier.
///
/// Clones share the same underlying channel. Subscribers receive every
/// event published after they subscribe, up to the configured capacity.
///
/// # Example
///
/// ```
/// use palaver::message::adapters::bus::EventBus;
/// use palaver::message::domain::{ChannelId, StoreEvent, UserId};
/// use palaver::message::ports::notifier::ChangeNotifier;
///
/// let bus = EventBus::new(16);
/// let mut rx = bus.subscribe();
/// bus.publish(StoreEvent::ChannelRead {
///     channel_id: ChannelId::new(),
///     user_id: UserId::new(),
///     cleared: 2,
/// });
/// let event = rx.try_recv().expect("event should be delivered");
/// assert_eq!(event.name(), "channel_read");
/// ```
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<StoreEvent>,
}

impl EventBus {
    /// Creates a bus retaining up to `capacity` undelivered events per
    /// subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Opens a new subscription receiving all subsequently published
    /// events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl ChangeNotifier for EventBus {
    fn publish(&self, event: StoreEvent) {
        // A send error only means there are currently no subscribers;
        // the mutation that produced the event has already committed.
        let delivered = self.sender.send(event);
        if let Err(broadcast::error::SendError(dropped)) = delivered {
            tracing::trace!(event = dropped.name(), "no subscribers, event dropped");
        }
    }
}
