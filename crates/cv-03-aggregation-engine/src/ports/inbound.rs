//! Inbound ports (API).

use shared_types::{ChainMetrics, ChainSnapshot, ProcessedBlock, ProcessedTransaction};

/// Read access to the engine's state.
///
/// Every method returns owned copies. Lookups of unknown hashes return
/// `None`, never an error.
pub trait ChainDataApi: Send + Sync {
    /// Up to `limit` blocks, highest block number first.
    fn recent_blocks(&self, limit: usize) -> Vec<ProcessedBlock>;

    /// Up to `limit` timestamped transactions, newest first.
    fn recent_transactions(&self, limit: usize) -> Vec<ProcessedTransaction>;

    /// All transactions currently pending.
    fn pending_transactions(&self) -> Vec<ProcessedTransaction>;

    fn block_by_hash(&self, hash: &str) -> Option<ProcessedBlock>;

    fn transaction_by_hash(&self, hash: &str) -> Option<ProcessedTransaction>;

    /// Metrics computed from the current windows.
    fn metrics(&self) -> ChainMetrics;

    /// Bulk export for initial population.
    fn snapshot(&self) -> ChainSnapshot;
}
