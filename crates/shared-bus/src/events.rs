//! # ChainViz Events
//!
//! The closed set of events that flow through the bus. Wire names returned by
//! [`ChainVizEvent::name`] are a contract between the normalizer, the engine
//! and every consumer.

use serde::{Deserialize, Serialize};
use shared_types::{
    ChainMetrics, Hash, ProcessedBlock, ProcessedTransaction, RawBlock, RawTransaction,
    TransactionStatus,
};

/// A transaction lifecycle update with its status attached by the normalizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEvent {
    /// Status derived from the inbound message type.
    pub status: TransactionStatus,
    /// The transaction as received.
    pub transaction: RawTransaction,
}

/// All events that can be published to the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ChainVizEvent {
    // =========================================================================
    // INGEST (published by the event normalizer)
    // =========================================================================
    /// `block-finalized`: a block arrived on the chain channel.
    BlockFinalized(RawBlock),

    /// `transaction-{pending|proposed|confirmed|rejected}`.
    Transaction(TransactionEvent),

    // =========================================================================
    // PROCESSED (published by the aggregation engine)
    // =========================================================================
    /// `processed-block-data`
    ProcessedBlockData(ProcessedBlock),

    /// `processed-transaction-data`
    ProcessedTransactionData(ProcessedTransaction),

    /// `transaction-removed`: a rejected transaction left the engine.
    TransactionRemoved {
        /// Hash of the removed transaction.
        hash: Hash,
    },

    /// `chain-metrics-updated`
    ChainMetricsUpdated(ChainMetrics),

    // =========================================================================
    // CONNECTION
    // =========================================================================
    /// `chainviz-disconnected`: the push connection dropped.
    Disconnected {
        /// Human readable cause.
        reason: String,
    },
}

impl ChainVizEvent {
    /// Build a transaction lifecycle event.
    #[must_use]
    pub fn transaction(status: TransactionStatus, transaction: RawTransaction) -> Self {
        Self::Transaction(TransactionEvent {
            status,
            transaction,
        })
    }

    /// The event kind, one per wire name.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::BlockFinalized(_) => EventKind::BlockFinalized,
            Self::Transaction(event) => match event.status {
                TransactionStatus::Pending => EventKind::TransactionPending,
                TransactionStatus::Proposed => EventKind::TransactionProposed,
                TransactionStatus::Confirmed => EventKind::TransactionConfirmed,
                TransactionStatus::Rejected => EventKind::TransactionRejected,
            },
            Self::ProcessedBlockData(_) => EventKind::ProcessedBlockData,
            Self::ProcessedTransactionData(_) => EventKind::ProcessedTransactionData,
            Self::TransactionRemoved { .. } => EventKind::TransactionRemoved,
            Self::ChainMetricsUpdated(_) => EventKind::ChainMetricsUpdated,
            Self::Disconnected { .. } => EventKind::Disconnected,
        }
    }

    /// Wire name of this event.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        self.kind().topic()
    }
}

/// One variant per wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    BlockFinalized,
    TransactionPending,
    TransactionProposed,
    TransactionConfirmed,
    TransactionRejected,
    ProcessedBlockData,
    ProcessedTransactionData,
    ChainMetricsUpdated,
    TransactionRemoved,
    Disconnected,
}

impl EventKind {
    /// Every kind, in contract order.
    pub const ALL: [EventKind; 10] = [
        EventKind::BlockFinalized,
        EventKind::TransactionPending,
        EventKind::TransactionProposed,
        EventKind::TransactionConfirmed,
        EventKind::TransactionRejected,
        EventKind::ProcessedBlockData,
        EventKind::ProcessedTransactionData,
        EventKind::ChainMetricsUpdated,
        EventKind::TransactionRemoved,
        EventKind::Disconnected,
    ];

    /// Wire name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BlockFinalized => "block-finalized",
            Self::TransactionPending => "transaction-pending",
            Self::TransactionProposed => "transaction-proposed",
            Self::TransactionConfirmed => "transaction-confirmed",
            Self::TransactionRejected => "transaction-rejected",
            Self::ProcessedBlockData => "processed-block-data",
            Self::ProcessedTransactionData => "processed-transaction-data",
            Self::ChainMetricsUpdated => "chain-metrics-updated",
            Self::TransactionRemoved => "transaction-removed",
            Self::Disconnected => "chainviz-disconnected",
        }
    }

    /// Look up a kind by wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    /// Topic group of this kind.
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::BlockFinalized
            | Self::TransactionPending
            | Self::TransactionProposed
            | Self::TransactionConfirmed
            | Self::TransactionRejected => EventTopic::Ingest,
            Self::ProcessedBlockData
            | Self::ProcessedTransactionData
            | Self::TransactionRemoved => EventTopic::Processed,
            Self::ChainMetricsUpdated => EventTopic::Metrics,
            Self::Disconnected => EventTopic::Connection,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Normalized domain events from the feed.
    Ingest,
    /// Processed records and removals from the engine.
    Processed,
    /// Metric snapshots from the engine.
    Metrics,
    /// Connection lifecycle.
    Connection,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Kinds to include. Empty means all kinds.
    pub kinds: Vec<EventKind>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            kinds: Vec::new(),
        }
    }

    /// Create a filter for specific event kinds.
    #[must_use]
    pub fn kinds(kinds: Vec<EventKind>) -> Self {
        Self {
            topics: Vec::new(),
            kinds,
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &ChainVizEvent) -> bool {
        let kind = event.kind();

        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&kind.topic());

        let kind_match = self.kinds.is_empty() || self.kinds.contains(&kind);

        topic_match && kind_match
    }
}
