//! # Bus Object
//!
//! The constructible bus and its publishing port.

use crate::events::{ChainVizEvent, EventFilter};
use crate::subscriber::{
    remove_from, Entry, EventSubscriber, Inbox, Registry, Subscription, SubscriptionId,
};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::{broadcast, mpsc, Notify};
use tracing::{debug, trace};
use uuid::Uuid;

/// Publishing port. Producers (normalizer, engine, resync) only see this.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Fan `event` out to every live subscription.
    ///
    /// Returns immediately with the number of deliveries; zero when nobody
    /// is listening.
    async fn publish(&self, event: ChainVizEvent) -> usize;

    /// Events handed to [`Self::publish`] so far, listened to or not.
    fn events_published(&self) -> u64;
}

/// Broadcast-backed bus shared through `Arc`.
///
/// Each instance is isolated: two engines on two buses never see each
/// other's traffic.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<ChainVizEvent>,
    /// Live subscriptions, with their cancel handle and lossless queue.
    subscriptions: Registry,
    published: AtomicU64,
    capacity: usize,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Bus whose plain subscribers lag after `capacity` unread events.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Register a subscription. Only events matching `filter` are yielded.
    ///
    /// Reads the shared ring, so a reader more than `capacity` events
    /// behind skips the oldest.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        let inbox = Inbox::Broadcast(self.sender.subscribe());
        self.register(filter, inbox, None)
    }

    /// Register a subscription that receives every matching event.
    ///
    /// Events are filtered before queueing, so unrelated traffic never
    /// grows the queue.
    #[must_use]
    pub fn subscribe_lossless(&self, filter: EventFilter) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.register(filter.clone(), Inbox::Queue(rx), Some((filter, tx)))
    }

    fn register(
        &self,
        filter: EventFilter,
        inbox: Inbox,
        queue: Option<(EventFilter, mpsc::UnboundedSender<ChainVizEvent>)>,
    ) -> Subscription {
        let id = Uuid::new_v4();
        let cancelled = Arc::new(Notify::new());
        let lossless = queue.is_some();
        if let Ok(mut registry) = self.subscriptions.write() {
            registry.insert(
                id,
                Entry {
                    cancelled: Arc::clone(&cancelled),
                    queue,
                },
            );
        }
        debug!(
            subscription = %id,
            topics = ?filter.topics,
            kinds = ?filter.kinds,
            lossless,
            "Subscribed"
        );

        Subscription::new(id, inbox, filter, cancelled, Arc::clone(&self.subscriptions))
    }

    /// Deregister `id`, waking its pending `recv` with `None`.
    ///
    /// Returns `false` for an unknown or already removed id.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = remove_from(&self.subscriptions, id);
        if removed {
            debug!(subscription = %id, "Unsubscribed");
        }
        removed
    }

    /// Registered subscriptions of both kinds.
    #[must_use]
    pub fn active_subscriptions(&self) -> usize {
        self.subscriptions.read().map(|registry| registry.len()).unwrap_or(0)
    }

    /// Broadcast receivers still alive, which can briefly exceed the plain
    /// subscriptions while a handle is being dropped.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Hand `event` to every lossless queue whose filter accepts it.
    fn deliver_queued(&self, event: &ChainVizEvent) -> usize {
        let Ok(registry) = self.subscriptions.read() else {
            return 0;
        };
        registry
            .values()
            .filter_map(|entry| entry.queue.as_ref())
            .filter(|(filter, _)| filter.matches(event))
            .filter(|(_, tx)| tx.send(event.clone()).is_ok())
            .count()
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InMemoryEventBus {
    fn drop(&mut self) {
        // Lossless queues hold no broadcast receiver, so wake them here.
        if let Ok(mut registry) = self.subscriptions.write() {
            for (_, entry) in registry.drain() {
                entry.cancelled.notify_one();
            }
        }
    }
}

impl EventSubscriber for InMemoryEventBus {
    fn subscribe(&self, filter: EventFilter) -> Subscription {
        InMemoryEventBus::subscribe(self, filter)
    }

    fn subscribe_lossless(&self, filter: EventFilter) -> Subscription {
        InMemoryEventBus::subscribe_lossless(self, filter)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        InMemoryEventBus::unsubscribe(self, id)
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: ChainVizEvent) -> usize {
        let name = event.name();
        self.published.fetch_add(1, Ordering::Relaxed);

        let queued = self.deliver_queued(&event);
        // `send` only fails when there are no receivers.
        let broadcast = self.sender.send(event).unwrap_or(0);
        trace!(event = name, broadcast, queued, "Published");
        broadcast + queued
    }

    fn events_published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}
