//! UI-state mirror: copies bus events into display state.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::debug;

use chainviz_telemetry::component::RUNTIME;
use cv_01_transport::ConnectionState;
use shared_bus::{ChainVizEvent, EventFilter, EventTopic, InMemoryEventBus, Subscription};
use shared_types::{ChainMetrics, ProcessedBlock, ProcessedTransaction};

/// Blocks kept for display.
pub const MAX_RECENT_BLOCKS: usize = 20;

/// Transactions kept for display.
pub const MAX_RECENT_TRANSACTIONS: usize = 50;

/// What a dashboard shows.
#[derive(Debug, Clone)]
pub struct UiState {
    pub connection: ConnectionState,
    /// Cause of the last lost connection.
    pub last_disconnect: Option<String>,
    pub metrics: Option<ChainMetrics>,
    /// Newest first.
    pub recent_blocks: VecDeque<ProcessedBlock>,
    /// Newest first, one entry per hash.
    pub recent_transactions: VecDeque<ProcessedTransaction>,
    pub removed_transactions: u64,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            connection: ConnectionState::Disconnected,
            last_disconnect: None,
            metrics: None,
            recent_blocks: VecDeque::with_capacity(MAX_RECENT_BLOCKS),
            recent_transactions: VecDeque::with_capacity(MAX_RECENT_TRANSACTIONS),
            removed_transactions: 0,
        }
    }
}

impl UiState {
    pub fn connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Fold one bus event into the display state.
    pub fn apply(&mut self, event: &ChainVizEvent) {
        match event {
            ChainVizEvent::ProcessedBlockData(block) => {
                self.recent_blocks.retain(|b| b.hash != block.hash);
                self.recent_blocks.push_front(block.clone());
                self.recent_blocks.truncate(MAX_RECENT_BLOCKS);
            }
            ChainVizEvent::ProcessedTransactionData(tx) => {
                self.recent_transactions.retain(|t| t.hash != tx.hash);
                self.recent_transactions.push_front(tx.clone());
                self.recent_transactions.truncate(MAX_RECENT_TRANSACTIONS);
            }
            ChainVizEvent::TransactionRemoved { hash } => {
                self.recent_transactions.retain(|t| &t.hash != hash);
                self.removed_transactions += 1;
            }
            ChainVizEvent::ChainMetricsUpdated(metrics) => {
                self.metrics = Some(*metrics);
            }
            // `connection` follows the transport's state watch only; this
            // event can trail a reconnect.
            ChainVizEvent::Disconnected { reason } => {
                self.last_disconnect = Some(reason.clone());
            }
            ChainVizEvent::BlockFinalized(_) | ChainVizEvent::Transaction(_) => {}
        }
    }
}

/// Cheap clonable read handle onto the mirrored state.
#[derive(Clone, Default)]
pub struct UiStateHandle(Arc<RwLock<UiState>>);

impl UiStateHandle {
    /// Copy of the current state.
    pub fn snapshot(&self) -> UiState {
        self.0.read().clone()
    }

    pub fn connected(&self) -> bool {
        self.0.read().connected()
    }
}

/// Subscribes to processed, metrics and connection events.
pub struct UiStateMirror {
    state: UiStateHandle,
    subscription: Subscription,
}

impl UiStateMirror {
    pub fn new(bus: &InMemoryEventBus) -> Self {
        let filter = EventFilter::topics(vec![
            EventTopic::Processed,
            EventTopic::Metrics,
            EventTopic::Connection,
        ]);
        Self {
            state: UiStateHandle::default(),
            subscription: bus.subscribe_lossless(filter),
        }
    }

    pub fn handle(&self) -> UiStateHandle {
        self.state.clone()
    }

    /// Mirror bus events and connection changes until the bus side ends.
    pub async fn run(mut self, mut connection: watch::Receiver<ConnectionState>) {
        self.state.0.write().connection = *connection.borrow_and_update();
        let mut watching = true;

        loop {
            tokio::select! {
                event = self.subscription.recv() => match event {
                    Some(event) => self.state.0.write().apply(&event),
                    None => break,
                },
                changed = connection.changed(), if watching => {
                    if changed.is_ok() {
                        let state = *connection.borrow_and_update();
                        self.state.0.write().connection = state;
                    } else {
                        watching = false;
                    }
                }
            }
        }
        debug!(component = RUNTIME, "UI state mirror stopped");
    }
}
