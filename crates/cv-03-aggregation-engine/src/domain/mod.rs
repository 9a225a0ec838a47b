//! # Domain Layer - Aggregation Engine
//!
//! Pure, synchronous state. The service layer wraps it in a lock.

pub mod aggregator;
pub mod errors;
pub mod metrics;
pub mod processing;
pub mod window;

pub use aggregator::{ChainAggregator, SNAPSHOT_BLOCKS, SNAPSHOT_TRANSACTIONS};
pub use errors::EngineError;
pub use metrics::{compute_metrics, CONFIRMATION_DEPTH, THROUGHPUT_SAMPLES};
pub use processing::{process_block, process_transaction};
pub use window::{SlidingWindow, WINDOW_CAPACITY};
