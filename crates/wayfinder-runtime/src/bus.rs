//! Marker event bus.
//!
//! A [`tokio::sync::broadcast`] channel carrying [`MarkerEvent`]s from the
//! marker lifecycle manager to rendering/audio collaborators. Every
//! subscriber receives every event without any single subscriber blocking
//! the others; slow subscribers drop old events rather than stalling the
//! scan cycle.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::warn;
use wayfinder_types::{MarkerEvent, MarkerSink, WayError};

/// Default channel capacity (buffered events before old ones are dropped
/// for slow subscribers).
const DEFAULT_CAPACITY: usize = 256;

/// Shared marker event bus. Clone it cheaply – all clones share the same
/// underlying broadcast channel.
#[derive(Clone, Debug)]
pub struct MarkerBus {
    sender: broadcast::Sender<MarkerEvent>,
}

impl MarkerBus {
    /// Create a bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to every subscriber.
    ///
    /// Returns the number of active receivers, or [`WayError::Channel`]
    /// when nobody is listening.
    pub fn publish(&self, event: MarkerEvent) -> Result<usize, WayError> {
        self.sender
            .send(event)
            .map_err(|e| WayError::Channel(format!("marker bus send error: {e}")))
    }

    /// Subscribe to all marker events.
    pub fn subscribe(&self) -> broadcast::Receiver<MarkerEvent> {
        self.sender.subscribe()
    }

    /// Wrap this bus in a [`MarkerSink`] suitable for the marker lifecycle
    /// manager.
    pub fn sink(&self) -> Arc<dyn MarkerSink> {
        Arc::new(BroadcastSink { bus: self.clone() })
    }
}

impl Default for MarkerBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// [`MarkerSink`] adapter over a [`MarkerBus`].
///
/// Emission is fire-and-forget: an empty bus is a normal condition, any
/// other send failure is logged and swallowed so the scan cycle never
/// stalls on a collaborator.
pub struct BroadcastSink {
    bus: MarkerBus,
}

impl MarkerSink for BroadcastSink {
    fn emit(&self, event: MarkerEvent) {
        // No subscribers yet is a normal condition; nothing to deliver.
        let _ = self.bus.publish(event);
    }
}

/// Drain a receiver without blocking, logging lag. Convenience for
/// collaborators that poll between frames.
pub fn drain(rx: &mut broadcast::Receiver<MarkerEvent>) -> Vec<MarkerEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(broadcast::error::TryRecvError::Lagged(n)) => {
                warn!(lagged_by = n, "marker event subscriber lagged");
                continue;
            }
            Err(broadcast::error::TryRecvError::Empty)
            | Err(broadcast::error::TryRecvError::Closed) => break,
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_and_receive() {
        let bus = MarkerBus::default();
        let mut rx = bus.subscribe();
        bus.publish(MarkerEvent::Cleared).expect("one subscriber");
        let event = rx.recv().await.expect("event delivered");
        assert_eq!(event, MarkerEvent::Cleared);
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = MarkerBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        bus.publish(MarkerEvent::StyleChanged { proximity: true, spotlight: false })
            .expect("two subscribers");
        assert!(rx1.recv().await.is_ok());
        assert!(rx2.recv().await.is_ok());
    }

    #[test]
    fn publish_without_subscribers_is_a_channel_error() {
        let bus = MarkerBus::default();
        let result = bus.publish(MarkerEvent::Cleared);
        assert!(matches!(result, Err(WayError::Channel(_))));
    }

    #[test]
    fn sink_swallows_the_no_subscriber_case() {
        let bus = MarkerBus::default();
        let sink = bus.sink();
        // Must not panic or error with nobody listening.
        sink.emit(MarkerEvent::Cleared);
    }

    #[test]
    fn drain_collects_pending_events_without_blocking() {
        let bus = MarkerBus::default();
        let mut rx = bus.subscribe();
        for _ in 0..3 {
            bus.publish(MarkerEvent::Cleared).unwrap();
        }
        let events = drain(&mut rx);
        assert_eq!(events.len(), 3);
        assert!(drain(&mut rx).is_empty());
    }
}
