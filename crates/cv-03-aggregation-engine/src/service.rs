//! # Aggregation Service
//!
//! Wires the [`ChainAggregator`] to the bus.
//!
//! ```text
//!  Event Bus ── Ingest topic ──▶ IngestHandler ──▶ ChainAggregator::apply
//!      ▲                                                   │
//!      └──────── processed records + metrics ──────────────┘
//! ```
//!
//! The write lock is held only while applying an event, never across a
//! publish.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use chainviz_telemetry::component::ENGINE;
use shared_bus::{
    ChainVizEvent, EventFilter, EventPublisher, EventTopic, InMemoryEventBus, Subscription,
    SubscriptionId,
};
use shared_types::{ChainMetrics, ChainSnapshot, ProcessedBlock, ProcessedTransaction};

use crate::domain::ChainAggregator;
use crate::ports::inbound::ChainDataApi;
use crate::ports::outbound::{SystemTimeSource, TimeSource};

/// Apply one event and publish whatever it produced.
async fn process(aggregator: &RwLock<ChainAggregator>, bus: &InMemoryEventBus, event: ChainVizEvent) {
    let result = aggregator.write().apply(&event);
    match result {
        Ok(outputs) => {
            for output in outputs {
                bus.publish(output).await;
            }
        }
        Err(e) => {
            warn!(component = ENGINE, error = %e, payload = ?event, "Dropping event");
        }
    }
}

/// Background loop feeding ingest events into the aggregator.
struct IngestHandler {
    aggregator: Arc<RwLock<ChainAggregator>>,
    bus: Arc<InMemoryEventBus>,
    subscription: Subscription,
}

impl IngestHandler {
    #[instrument(skip(self), name = "engine_ingest_handler")]
    async fn run(mut self) {
        info!(component = ENGINE, "Ingest handler started");
        while let Some(event) = self.subscription.recv().await {
            process(&self.aggregator, &self.bus, event).await;
        }
        debug!(component = ENGINE, "Ingest handler stopped");
    }
}

/// The running engine: state, bus handle and handler task.
pub struct AggregationService {
    aggregator: Arc<RwLock<ChainAggregator>>,
    bus: Arc<InMemoryEventBus>,
    handler: Mutex<Option<(SubscriptionId, JoinHandle<()>)>>,
}

impl AggregationService {
    pub fn new(bus: Arc<InMemoryEventBus>) -> Self {
        Self::with_time_source(bus, Arc::new(SystemTimeSource))
    }

    pub fn with_time_source(bus: Arc<InMemoryEventBus>, time_source: Arc<dyn TimeSource>) -> Self {
        Self {
            aggregator: Arc::new(RwLock::new(ChainAggregator::new(time_source))),
            bus,
            handler: Mutex::new(None),
        }
    }

    /// Subscribe to ingest events and spawn the handler. No-op if running.
    pub fn start(&self) {
        let mut handler = self.handler.lock();
        if handler.is_some() {
            return;
        }

        // Every ingest event counts toward the aggregate, so never lag.
        let subscription = self
            .bus
            .subscribe_lossless(EventFilter::topics(vec![EventTopic::Ingest]));
        let id = subscription.id();
        let task = tokio::spawn(
            IngestHandler {
                aggregator: Arc::clone(&self.aggregator),
                bus: Arc::clone(&self.bus),
                subscription,
            }
            .run(),
        );
        *handler = Some((id, task));
        info!(component = ENGINE, subscription = %id, "Aggregation engine started");
    }

    /// Apply one event directly, bypassing the subscription.
    pub async fn ingest(&self, event: ChainVizEvent) {
        process(&self.aggregator, &self.bus, event).await;
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handler.lock().is_some()
    }

    /// Unsubscribe and let the handler drain out.
    ///
    /// Safe to call repeatedly and before [`Self::start`].
    pub fn teardown(&self) {
        let Some((id, _task)) = self.handler.lock().take() else {
            return;
        };
        self.bus.unsubscribe(id);
        info!(component = ENGINE, subscription = %id, "Aggregation engine stopped");
    }
}

impl ChainDataApi for AggregationService {
    fn recent_blocks(&self, limit: usize) -> Vec<ProcessedBlock> {
        self.aggregator.read().recent_blocks(limit)
    }

    fn recent_transactions(&self, limit: usize) -> Vec<ProcessedTransaction> {
        self.aggregator.read().recent_transactions(limit)
    }

    fn pending_transactions(&self) -> Vec<ProcessedTransaction> {
        self.aggregator.read().pending_transactions()
    }

    fn block_by_hash(&self, hash: &str) -> Option<ProcessedBlock> {
        self.aggregator.read().block_by_hash(hash)
    }

    fn transaction_by_hash(&self, hash: &str) -> Option<ProcessedTransaction> {
        self.aggregator.read().transaction_by_hash(hash)
    }

    fn metrics(&self) -> ChainMetrics {
        self.aggregator.read().metrics()
    }

    fn snapshot(&self) -> ChainSnapshot {
        self.aggregator.read().snapshot()
    }
}

impl Drop for AggregationService {
    fn drop(&mut self) {
        self.teardown();
    }
}
