//! # Subscriptions
//!
//! Receiving side of the bus: filtered handles that deregister themselves.
//!
//! Two delivery modes exist. A plain subscription reads the shared broadcast
//! ring and may lag. A lossless subscription gets its own unbounded queue,
//! filled only with events matching its filter, and never skips.

use crate::events::{ChainVizEvent, EventFilter};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, Notify};
use tracing::{debug, warn};
use uuid::Uuid;

/// Identity of one subscription on one bus.
pub type SubscriptionId = Uuid;

/// Bus-side record of one subscription.
pub(crate) struct Entry {
    /// Fired when the bus removes this subscription.
    pub(crate) cancelled: Arc<Notify>,
    /// Present for lossless subscriptions, which are filtered on send.
    pub(crate) queue: Option<(EventFilter, mpsc::UnboundedSender<ChainVizEvent>)>,
}

/// Live subscriptions by id.
pub(crate) type Registry = Arc<RwLock<HashMap<SubscriptionId, Entry>>>;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The event bus was closed.
    #[error("Event bus closed")]
    Closed,

    /// The subscription was removed from the bus.
    #[error("Subscription {0} was unsubscribed")]
    Unsubscribed(SubscriptionId),
}

/// Subscribing port.
pub trait EventSubscriber: Send + Sync {
    fn subscribe(&self, filter: EventFilter) -> Subscription;

    /// Subscribe with a queue that never drops events.
    fn subscribe_lossless(&self, filter: EventFilter) -> Subscription;

    /// Remove a subscription. Returns `false` if it was already gone.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

/// Where a subscription reads from.
pub(crate) enum Inbox {
    /// Shared ring, filtered here.
    Broadcast(broadcast::Receiver<ChainVizEvent>),
    /// Private queue, already filtered by the publisher.
    Queue(mpsc::UnboundedReceiver<ChainVizEvent>),
}

/// Filtered receiver for one consumer.
///
/// Dropping the handle deregisters it.
pub struct Subscription {
    id: SubscriptionId,
    inbox: Inbox,
    filter: EventFilter,
    cancelled: Arc<Notify>,
    registry: Registry,
    skipped: u64,
}

impl Subscription {
    pub(crate) fn new(
        id: SubscriptionId,
        inbox: Inbox,
        filter: EventFilter,
        cancelled: Arc<Notify>,
        registry: Registry,
    ) -> Self {
        Self {
            id,
            inbox,
            filter,
            cancelled,
            registry,
            skipped: 0,
        }
    }

    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Whether the bus still knows this subscription.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.registry
            .read()
            .map(|subs| subs.contains_key(&self.id))
            .unwrap_or(false)
    }

    /// Whether this subscription can never skip events.
    #[must_use]
    pub fn is_lossless(&self) -> bool {
        matches!(self.inbox, Inbox::Queue(_))
    }

    /// Events this subscription missed by lagging. Always zero when lossless.
    #[must_use]
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    fn record_lag(&mut self, count: u64) {
        self.skipped += count;
        warn!(
            subscription = %self.id,
            lagged = count,
            skipped_total = self.skipped,
            "Subscriber lagged, events dropped"
        );
    }

    /// Next matching event, or `None` once the bus is gone or this
    /// subscription was removed.
    pub async fn recv(&mut self) -> Option<ChainVizEvent> {
        loop {
            if !self.is_active() {
                return None;
            }

            let event = match &mut self.inbox {
                Inbox::Queue(queue) => {
                    return tokio::select! {
                        biased;
                        _ = self.cancelled.notified() => None,
                        event = queue.recv() => event,
                    };
                }
                Inbox::Broadcast(receiver) => {
                    let received = tokio::select! {
                        biased;
                        _ = self.cancelled.notified() => return None,
                        received = receiver.recv() => received,
                    };
                    match received {
                        Ok(event) => event,
                        Err(broadcast::error::RecvError::Closed) => return None,
                        Err(broadcast::error::RecvError::Lagged(count)) => {
                            self.record_lag(count);
                            continue;
                        }
                    }
                }
            };

            if self.filter.matches(&event) {
                return Some(event);
            }
        }
    }

    /// Non-blocking [`Self::recv`]. `Ok(None)` means nothing matching is
    /// buffered right now.
    pub fn try_recv(&mut self) -> Result<Option<ChainVizEvent>, SubscriptionError> {
        if !self.is_active() {
            return Err(SubscriptionError::Unsubscribed(self.id));
        }

        loop {
            let event = match &mut self.inbox {
                Inbox::Queue(queue) => {
                    return match queue.try_recv() {
                        Ok(event) => Ok(Some(event)),
                        Err(mpsc::error::TryRecvError::Empty) => Ok(None),
                        Err(mpsc::error::TryRecvError::Disconnected) => {
                            Err(SubscriptionError::Closed)
                        }
                    };
                }
                Inbox::Broadcast(receiver) => match receiver.try_recv() {
                    Ok(event) => event,
                    Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                    Err(broadcast::error::TryRecvError::Closed) => {
                        return Err(SubscriptionError::Closed)
                    }
                    Err(broadcast::error::TryRecvError::Lagged(count)) => {
                        self.record_lag(count);
                        continue;
                    }
                },
            };

            if self.filter.matches(&event) {
                return Ok(Some(event));
            }
        }
    }

    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }

    /// Remove this subscription from the bus.
    ///
    /// Returns `false` if the bus had already removed it.
    pub fn unsubscribe(self) -> bool {
        remove_from(&self.registry, self.id)
        // Drop runs next and finds nothing left to remove.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if remove_from(&self.registry, self.id) {
            debug!(subscription = %self.id, "Subscription dropped");
        }
    }
}

/// Remove `id` from the registry and wake its receiver.
pub(crate) fn remove_from(registry: &Registry, id: SubscriptionId) -> bool {
    let Ok(mut subs) = registry.write() else {
        return false;
    };
    match subs.remove(&id) {
        Some(entry) => {
            entry.cancelled.notify_one();
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventKind, EventTopic};
    use crate::publisher::InMemoryEventBus;
    use crate::EventPublisher;
    use shared_types::{ChainMetrics, RawTransaction, TransactionStatus};
    use std::time::Duration;
    use tokio::time::timeout;

    fn pending(hash: &str) -> ChainVizEvent {
        ChainVizEvent::transaction(
            TransactionStatus::Pending,
            RawTransaction {
                hash: hash.to_string(),
                timestamp: None,
                context: None,
            },
        )
    }

    #[tokio::test]
    async fn test_subscription_recv() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::all());

        bus.publish(pending("0x1")).await;

        let received = timeout(Duration::from_millis(100), sub.recv()).await.unwrap();
        assert_eq!(received.map(|e| e.kind()), Some(EventKind::TransactionPending));
    }

    #[tokio::test]
    async fn test_subscription_filter() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::topics(vec![EventTopic::Metrics]));

        bus.publish(pending("0x1")).await;
        bus.publish(ChainVizEvent::ChainMetricsUpdated(ChainMetrics::default()))
            .await;

        let received = timeout(Duration::from_millis(100), sub.recv())
            .await
            .expect("timeout")
            .expect("event");

        assert!(matches!(received, ChainVizEvent::ChainMetricsUpdated(_)));
    }

    #[tokio::test]
    async fn test_subscription_drop_cleanup() {
        let bus = InMemoryEventBus::new();

        {
            let _sub1 = bus.subscribe(EventFilter::all());
            let _sub2 = bus.subscribe(EventFilter::all());
            assert_eq!(bus.subscriber_count(), 2);
            assert_eq!(bus.active_subscriptions(), 2);
        }

        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.active_subscriptions(), 0);
    }

    #[tokio::test]
    async fn test_explicit_unsubscribe_then_drop() {
        let bus = InMemoryEventBus::new();
        let sub = bus.subscribe(EventFilter::all());
        let id = sub.id();

        assert!(sub.unsubscribe());
        assert_eq!(bus.active_subscriptions(), 0);
        // A second removal is a quiet no-op.
        assert!(!bus.unsubscribe(id));
    }

    #[tokio::test]
    async fn test_bus_unsubscribe_ends_pending_recv() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::all());
        let id = sub.id();

        let waiter = tokio::spawn(async move { sub.recv().await });
        tokio::task::yield_now().await;

        assert!(bus.unsubscribe(id));
        let result = timeout(Duration::from_millis(200), waiter)
            .await
            .expect("timeout")
            .expect("join");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_try_recv_empty() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::all());

        assert!(matches!(sub.try_recv(), Ok(None)));
    }

    #[tokio::test]
    async fn test_try_recv_after_unsubscribe() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::all());
        bus.unsubscribe(sub.id());

        assert!(matches!(
            sub.try_recv(),
            Err(SubscriptionError::Unsubscribed(_))
        ));
    }

    #[tokio::test]
    async fn test_try_recv_event() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::all());

        bus.publish(pending("0x2")).await;

        let result = sub.try_recv();
        assert!(matches!(result, Ok(Some(ChainVizEvent::Transaction(_)))));
    }

    #[tokio::test]
    async fn test_lagging_subscriber_does_not_block_siblings() {
        let bus = InMemoryEventBus::with_capacity(4);
        let mut slow = bus.subscribe(EventFilter::all());
        let mut fast = bus.subscribe(EventFilter::all());

        for i in 0..10 {
            bus.publish(pending(&format!("0x{i}"))).await;
            // The fast subscriber keeps up.
            let event = fast.try_recv().unwrap().unwrap();
            assert_eq!(event.kind(), EventKind::TransactionPending);
        }

        // The slow one skips what it missed and still receives the newest.
        let mut seen = 0;
        while let Ok(Some(_)) = slow.try_recv() {
            seen += 1;
        }
        assert!(seen <= 4);
        assert!(seen > 0);
        assert_eq!(slow.skipped(), 10 - seen as u64);
        assert_eq!(fast.skipped(), 0);
    }

    #[tokio::test]
    async fn test_lossless_subscription_outlasts_capacity() {
        let bus = InMemoryEventBus::with_capacity(4);
        let mut lossless = bus.subscribe_lossless(EventFilter::all());
        let mut plain = bus.subscribe(EventFilter::all());
        assert!(lossless.is_lossless());
        assert!(!plain.is_lossless());

        for i in 0..50 {
            bus.publish(pending(&format!("0x{i}"))).await;
        }

        let mut hashes = Vec::new();
        while let Ok(Some(event)) = lossless.try_recv() {
            if let ChainVizEvent::Transaction(tx) = event {
                hashes.push(tx.transaction.hash);
            }
        }
        let expected: Vec<String> = (0..50).map(|i| format!("0x{i}")).collect();
        assert_eq!(hashes, expected);
        assert_eq!(lossless.skipped(), 0);

        while let Ok(Some(_)) = plain.try_recv() {}
        assert_eq!(plain.skipped(), 46);
    }

    #[tokio::test]
    async fn test_lossless_queue_only_holds_matching_events() {
        let bus = InMemoryEventBus::with_capacity(4);
        let mut metrics = bus.subscribe_lossless(EventFilter::topics(vec![EventTopic::Metrics]));

        for i in 0..20 {
            bus.publish(pending(&format!("0x{i}"))).await;
        }
        bus.publish(ChainVizEvent::ChainMetricsUpdated(ChainMetrics::default()))
            .await;

        let first = metrics.try_recv().unwrap();
        assert!(matches!(first, Some(ChainVizEvent::ChainMetricsUpdated(_))));
        assert!(matches!(metrics.try_recv(), Ok(None)));
    }

    #[tokio::test]
    async fn test_lossless_recv_ends_on_unsubscribe_and_bus_drop() {
        let bus = InMemoryEventBus::new();
        let mut first = bus.subscribe_lossless(EventFilter::all());
        let id = first.id();
        let waiter = tokio::spawn(async move { first.recv().await });
        tokio::task::yield_now().await;

        assert!(bus.unsubscribe(id));
        let result = timeout(Duration::from_millis(200), waiter)
            .await
            .expect("timeout")
            .expect("join");
        assert!(result.is_none());

        let mut second = bus.subscribe_lossless(EventFilter::all());
        drop(bus);
        let result = timeout(Duration::from_millis(200), second.recv())
            .await
            .expect("timeout");
        assert!(result.is_none());
    }
}
