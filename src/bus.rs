//! Event bus: a bounded publish/subscribe buffer with a single logical
//! subscriber (spec §4.7).
//!
//! `publish` suspends when the buffer is full — this is the pipeline's
//! back-pressure mechanism between a faster chain-sync source and a slower
//! database sink. There is no replay and no fan-out: the receiver half is
//! handed to exactly one dispatcher.

use tokio::sync::mpsc;

use crate::events::Event;

/// Default buffer capacity (spec §4.7: "default 50").
pub const DEFAULT_CAPACITY: usize = 50;

/// Publishing half of the bus.
#[derive(Clone)]
pub struct EventBus {
    sender: mpsc::Sender<Event>,
}

/// The single logical subscriber's receiving half.
pub struct EventSubscriber {
    receiver: mpsc::Receiver<Event>,
}

impl EventBus {
    /// Build a bus with the given buffer capacity, returning the publisher
    /// and its one subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, EventSubscriber) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, EventSubscriber { receiver })
    }

    /// Publish an event, suspending while the buffer is full.
    ///
    /// Fails only if the subscriber has been dropped, which only happens
    /// during shutdown.
    pub async fn publish(&self, event: Event) -> Result<(), mpsc::error::SendError<Event>> {
        self.sender.send(event).await
    }
}

impl EventSubscriber {
    /// Receive the next event, or `None` once every publisher has dropped.
    pub async fn recv(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Block, TxBody};

    #[tokio::test]
    async fn published_events_are_received_in_order() {
        let (bus, mut sub) = EventBus::new(DEFAULT_CAPACITY);
        bus.publish(Event::BlockReceived {
            block: Block {
                slot: 1,
                transactions: Vec::<TxBody>::new(),
            },
        })
        .await
        .unwrap();
        bus.publish(Event::Rollback { point: 1 }).await.unwrap();

        assert_eq!(sub.recv().await.unwrap().slot(), Some(1));
        assert_eq!(sub.recv().await.unwrap().slot(), None);
    }

    #[tokio::test]
    async fn publish_suspends_when_buffer_is_full() {
        let (bus, mut sub) = EventBus::new(1);
        bus.publish(Event::Rollback { point: 1 }).await.unwrap();

        let bus2 = bus.clone();
        let publisher = tokio::spawn(async move { bus2.publish(Event::Rollback { point: 2 }).await });

        tokio::task::yield_now().await;
        assert!(!publisher.is_finished());

        sub.recv().await.unwrap();
        publisher.await.unwrap().unwrap();
    }
}
