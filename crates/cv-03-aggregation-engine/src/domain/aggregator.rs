//! The engine's state machine.

use std::sync::Arc;

use indexmap::IndexMap;

use chainviz_telemetry::component::ENGINE;
use chainviz_telemetry::{log_block_event, log_tx_event};
use shared_bus::{ChainVizEvent, TransactionEvent};
use shared_types::{
    ChainMetrics, ChainSnapshot, Hash, ProcessedBlock, ProcessedTransaction, RawBlock,
    TransactionStatus,
};

use super::errors::EngineError;
use super::metrics::{compute_metrics, THROUGHPUT_SAMPLES};
use super::processing::{process_block, process_transaction};
use super::window::{SlidingWindow, WINDOW_CAPACITY};
use crate::ports::outbound::TimeSource;

/// Blocks included in a snapshot.
pub const SNAPSHOT_BLOCKS: usize = 50;

/// Transactions included in a snapshot.
pub const SNAPSHOT_TRANSACTIONS: usize = 100;

/// Identity-keyed blocks and transactions plus the metrics windows.
///
/// Maps keep first-insertion order. Replacing a hash keeps its position;
/// removing one keeps the relative order of the rest.
pub struct ChainAggregator {
    blocks: IndexMap<Hash, ProcessedBlock>,
    transactions: IndexMap<Hash, ProcessedTransaction>,
    block_timestamps: SlidingWindow<u64>,
    block_tx_counts: SlidingWindow<u64>,
    /// Difficulty of the newest blocks in arrival order, re-deliveries included.
    block_difficulties: SlidingWindow<u64>,
    time_source: Arc<dyn TimeSource>,
}

impl ChainAggregator {
    pub fn new(time_source: Arc<dyn TimeSource>) -> Self {
        Self {
            blocks: IndexMap::new(),
            transactions: IndexMap::new(),
            block_timestamps: SlidingWindow::new(WINDOW_CAPACITY),
            block_tx_counts: SlidingWindow::new(WINDOW_CAPACITY),
            block_difficulties: SlidingWindow::new(THROUGHPUT_SAMPLES),
            time_source,
        }
    }

    /// Apply one bus event and return the events to publish in response.
    ///
    /// Events the engine does not consume yield an empty list. On error no
    /// state has changed.
    pub fn apply(&mut self, event: &ChainVizEvent) -> Result<Vec<ChainVizEvent>, EngineError> {
        match event {
            ChainVizEvent::BlockFinalized(raw) => self.on_block(raw),
            ChainVizEvent::Transaction(tx) if tx.status == TransactionStatus::Rejected => {
                Ok(self.on_rejected(tx))
            }
            ChainVizEvent::Transaction(tx) => self.on_transaction(tx),
            _ => Ok(Vec::new()),
        }
    }

    fn on_block(&mut self, raw: &RawBlock) -> Result<Vec<ChainVizEvent>, EngineError> {
        let block = process_block(raw)?;

        // Window sample falls back to arrival time; the record keeps `None`.
        let sampled_at = block.timestamp.unwrap_or_else(|| self.time_source.now());
        self.block_timestamps.push(sampled_at);
        self.block_tx_counts.push(block.transaction_count);
        self.block_difficulties.push(block.difficulty);

        let replaced = self.blocks.insert(block.hash.clone(), block.clone()).is_some();
        log_block_event!(
            debug,
            ENGINE,
            "Block processed",
            block.hash,
            block.number,
            replaced = replaced,
            tx_count = block.transaction_count
        );

        Ok(vec![
            ChainVizEvent::ProcessedBlockData(block),
            ChainVizEvent::ChainMetricsUpdated(self.metrics()),
        ])
    }

    fn on_transaction(&mut self, event: &TransactionEvent) -> Result<Vec<ChainVizEvent>, EngineError> {
        let tx = process_transaction(event)?;

        // Latest status wins; lifecycle order is not enforced.
        let previous = self
            .transactions
            .insert(tx.hash.clone(), tx.clone())
            .map(|old| old.status);
        log_tx_event!(
            debug,
            ENGINE,
            "Transaction updated",
            tx.hash,
            tx.status,
            previous = ?previous
        );

        Ok(vec![ChainVizEvent::ProcessedTransactionData(tx)])
    }

    fn on_rejected(&mut self, event: &TransactionEvent) -> Vec<ChainVizEvent> {
        let hash = event.transaction.hash.clone();
        let existed = self.transactions.shift_remove(&hash).is_some();
        log_tx_event!(
            debug,
            ENGINE,
            "Transaction removed",
            hash,
            event.status,
            existed = existed
        );
        vec![ChainVizEvent::TransactionRemoved { hash }]
    }

    /// Current metrics, computed from the windows.
    pub fn metrics(&self) -> ChainMetrics {
        compute_metrics(
            &self.block_timestamps,
            &self.block_tx_counts,
            &self.block_difficulties.to_vec(),
            self.pending_count(),
        )
    }

    fn pending_count(&self) -> usize {
        self.transactions
            .values()
            .filter(|tx| tx.status == TransactionStatus::Pending)
            .count()
    }

    /// Up to `limit` blocks, highest number first. Unnumbered blocks sort last.
    pub fn recent_blocks(&self, limit: usize) -> Vec<ProcessedBlock> {
        let mut blocks: Vec<&ProcessedBlock> = self.blocks.values().collect();
        blocks.sort_by(|a, b| match (a.number, b.number) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        blocks.into_iter().take(limit).cloned().collect()
    }

    /// Up to `limit` timestamped transactions, newest first.
    pub fn recent_transactions(&self, limit: usize) -> Vec<ProcessedTransaction> {
        let mut txs: Vec<&ProcessedTransaction> = self
            .transactions
            .values()
            .filter(|tx| tx.timestamp.is_some())
            .collect();
        txs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        txs.into_iter().take(limit).cloned().collect()
    }

    /// Every transaction currently `PENDING`, in insertion order.
    pub fn pending_transactions(&self) -> Vec<ProcessedTransaction> {
        self.transactions
            .values()
            .filter(|tx| tx.status == TransactionStatus::Pending)
            .cloned()
            .collect()
    }

    pub fn block_by_hash(&self, hash: &str) -> Option<ProcessedBlock> {
        self.blocks.get(hash).cloned()
    }

    pub fn transaction_by_hash(&self, hash: &str) -> Option<ProcessedTransaction> {
        self.transactions.get(hash).cloned()
    }

    /// Last 50 blocks and last 100 transactions in insertion order, plus metrics.
    pub fn snapshot(&self) -> ChainSnapshot {
        ChainSnapshot {
            blocks: tail(&self.blocks, SNAPSHOT_BLOCKS),
            transactions: tail(&self.transactions, SNAPSHOT_TRANSACTIONS),
            metrics: self.metrics(),
        }
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    /// Block timestamp window, oldest first.
    pub fn block_timestamps(&self) -> Vec<u64> {
        self.block_timestamps.to_vec()
    }

    /// Block transaction-count window, oldest first.
    pub fn block_tx_counts(&self) -> Vec<u64> {
        self.block_tx_counts.to_vec()
    }

    /// Difficulties feeding the hash rate, oldest first.
    pub fn block_difficulties(&self) -> Vec<u64> {
        self.block_difficulties.to_vec()
    }
}

fn tail<V: Clone>(map: &IndexMap<Hash, V>, n: usize) -> Vec<V> {
    map.values().skip(map.len().saturating_sub(n)).cloned().collect()
}
