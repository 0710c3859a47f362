use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::RwLock;
use tracing::warn;
use uuid::Uuid;

use super::types::{EventMetadata, MarketDataEvent};

type Envelope = (MarketDataEvent, EventMetadata);

/// Subscription to the event bus. Each subscription owns a bounded queue; when the
/// subscriber falls behind, the oldest queued events are dropped and counted rather
/// than ever blocking the publisher.
#[derive(Debug)]
pub struct Subscription {
    id: Uuid,
    receiver: Receiver<Envelope>,
    dropped: Arc<AtomicU64>,
}

impl Subscription {
    /// Returns the subscription ID.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Receives the next event, blocking until one arrives. Returns `None` once the
    /// subscription has been removed from the bus and its queue is drained.
    pub fn receive(&self) -> Option<Envelope> {
        self.receiver.recv().ok()
    }

    /// Try to receive an event without blocking.
    pub fn try_receive(&self) -> Option<Envelope> {
        self.receiver.try_recv().ok()
    }

    /// Number of events dropped because this subscriber's queue was full.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Bus-side state for one subscriber. The `evict` receiver is a clone of the
/// subscriber's end, kept so the publisher can pop the oldest entry on overflow.
#[derive(Debug)]
struct SubscriberSlot {
    sender: Sender<Envelope>,
    evict: Receiver<Envelope>,
    dropped: Arc<AtomicU64>,
}

/// Event bus distributing market-data events to subscribers. Publishing never
/// blocks: each subscriber has a bounded queue with a drop-oldest overflow policy,
/// and a subscriber that goes away is detached from the registry and logged.
#[derive(Debug, Clone)]
pub struct EventBus {
    inner: Arc<RwLock<HashMap<Uuid, SubscriberSlot>>>,
    sequence_counter: Arc<AtomicU64>,
    queue_capacity: usize,
    source: String,
}

impl EventBus {
    /// Creates a new event bus. `queue_capacity` bounds each subscriber's queue and
    /// is at least 1.
    pub fn new(source: impl Into<String>, queue_capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            sequence_counter: Arc::new(AtomicU64::new(0)),
            queue_capacity: queue_capacity.max(1),
            source: source.into(),
        }
    }

    /// Subscribes to events.
    pub fn subscribe(&self) -> Subscription {
        let id = Uuid::new_v4();
        let (sender, receiver) = bounded(self.queue_capacity);
        let dropped = Arc::new(AtomicU64::new(0));

        let mut inner = self.inner.write();
        inner.insert(
            id,
            SubscriberSlot {
                sender,
                evict: receiver.clone(),
                dropped: dropped.clone(),
            },
        );

        Subscription {
            id,
            receiver,
            dropped,
        }
    }

    /// Detaches a subscriber. Its pending queue stays readable until drained.
    pub fn unsubscribe(&self, subscription_id: Uuid) -> bool {
        let mut inner = self.inner.write();
        inner.remove(&subscription_id).is_some()
    }

    /// Publishes an event to all subscribers without blocking. A failing sink is
    /// detached and logged: a subscriber whose `Subscription` handle has been
    /// dropped is removed from the registry here, and never serviced again.
    pub fn publish(&self, event: MarketDataEvent) {
        let metadata = EventMetadata {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            sequence: self.sequence_counter.fetch_add(1, Ordering::SeqCst) + 1,
            source: self.source.clone(),
        };

        // Snapshot the slots so slow subscribers are serviced outside the lock.
        // A gone subscriber is detected here: its `Subscription` held the only
        // other reference to the dropped counter, so the slot now holds the last.
        let mut disconnected: Vec<Uuid> = Vec::new();
        let slots: Vec<(Uuid, Sender<Envelope>, Receiver<Envelope>, Arc<AtomicU64>)> = {
            let inner = self.inner.read();
            inner
                .iter()
                .filter_map(|(id, slot)| {
                    if Arc::strong_count(&slot.dropped) == 1 {
                        disconnected.push(*id);
                        None
                    } else {
                        Some((
                            *id,
                            slot.sender.clone(),
                            slot.evict.clone(),
                            slot.dropped.clone(),
                        ))
                    }
                })
                .collect()
        };

        for (id, sender, evict, dropped) in slots {
            let mut envelope = (event.clone(), metadata.clone());
            loop {
                match sender.try_send(envelope) {
                    Ok(()) => break,
                    Err(TrySendError::Full(returned)) => {
                        // Queue full: evict the oldest entry and retry.
                        if evict.try_recv().is_ok() {
                            dropped.fetch_add(1, Ordering::Relaxed);
                        }
                        envelope = returned;
                    }
                    Err(TrySendError::Disconnected(_)) => {
                        disconnected.push(id);
                        break;
                    }
                }
            }
        }

        if !disconnected.is_empty() {
            let mut inner = self.inner.write();
            for id in disconnected {
                if inner.remove(&id).is_some() {
                    warn!(subscription_id = %id, "subscriber disconnected, detached");
                }
            }
        }
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        let inner = self.inner.read();
        inner.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new("matchbook", 1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orderbook::BookSnapshot;

    fn snapshot_event(symbol: &str) -> MarketDataEvent {
        MarketDataEvent::BookSnapshot(BookSnapshot {
            symbol: symbol.to_string(),
            bids: Vec::new(),
            asks: Vec::new(),
            sequence: 0,
            timestamp: Utc::now(),
        })
    }

    #[test]
    fn test_subscribe_unsubscribe() {
        let bus = EventBus::default();
        assert_eq!(bus.subscriber_count(), 0);

        let subscription = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        assert!(bus.unsubscribe(subscription.id()));
        assert!(!bus.unsubscribe(subscription.id()));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_publish_receive() {
        let bus = EventBus::new("test", 16);
        let subscription = bus.subscribe();

        bus.publish(snapshot_event("BTC-USDT"));

        let (event, metadata) = subscription.receive().expect("should receive event");
        assert_eq!(event.channel(), "orderbook");
        assert_eq!(event.symbol(), "BTC-USDT");
        assert_eq!(metadata.sequence, 1);
        assert_eq!(metadata.source, "test");
    }

    #[test]
    fn test_multiple_subscribers_all_receive() {
        let bus = EventBus::new("test", 16);
        let sub1 = bus.subscribe();
        let sub2 = bus.subscribe();

        bus.publish(snapshot_event("BTC-USDT"));

        assert!(sub1.receive().is_some());
        assert!(sub2.receive().is_some());
    }

    #[test]
    fn test_slow_subscriber_drops_oldest() {
        let bus = EventBus::new("test", 2);
        let subscription = bus.subscribe();

        for symbol in ["A", "B", "C", "D"] {
            bus.publish(snapshot_event(symbol));
        }

        // The two oldest events were evicted, the two newest remain in order.
        assert_eq!(subscription.dropped_count(), 2);
        let (first, _) = subscription.try_receive().expect("queued event");
        let (second, _) = subscription.try_receive().expect("queued event");
        assert_eq!(first.symbol(), "C");
        assert_eq!(second.symbol(), "D");
        assert!(subscription.try_receive().is_none());
    }

    #[test]
    fn test_disconnected_subscriber_is_detached() {
        let bus = EventBus::new("test", 16);
        let keeper = bus.subscribe();
        let goner = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        // Dropping the handle without unsubscribing: the next publish detects
        // the dead slot, removes it, and still services the live subscriber.
        drop(goner);
        bus.publish(snapshot_event("BTC-USDT"));

        assert_eq!(bus.subscriber_count(), 1);
        let (event, _) = keeper.receive().expect("live subscriber still serviced");
        assert_eq!(event.symbol(), "BTC-USDT");

        // Publishing again does not resurrect the dead slot.
        bus.publish(snapshot_event("BTC-USDT"));
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn test_unsubscribed_queue_drains_then_closes() {
        let bus = EventBus::new("test", 16);
        let subscription = bus.subscribe();

        bus.publish(snapshot_event("BTC-USDT"));
        assert!(bus.unsubscribe(subscription.id()));

        // Buffered event is still delivered, then the stream ends.
        assert!(subscription.receive().is_some());
        assert!(subscription.receive().is_none());
    }

    #[test]
    fn test_metadata_sequence_increases() {
        let bus = EventBus::new("test", 16);
        let subscription = bus.subscribe();

        bus.publish(snapshot_event("A"));
        bus.publish(snapshot_event("B"));

        let (_, first) = subscription.receive().expect("event");
        let (_, second) = subscription.receive().expect("event");
        assert!(second.sequence > first.sequence);
    }
}
