//! Metric derivation.
//!
//! Every figure is a pure function of the window contents and the current
//! transaction map. Nothing here is stored.

use shared_types::ChainMetrics;

use super::window::SlidingWindow;

/// Recent blocks considered for throughput and hash rate.
pub const THROUGHPUT_SAMPLES: usize = 10;

/// Assumed confirmation depth, in blocks.
pub const CONFIRMATION_DEPTH: f64 = 6.0;

/// Mean gap between consecutive timestamps (milliseconds), in seconds.
///
/// Zero with fewer than two samples. Timestamps are taken in arrival
/// order, so a reordered feed can yield negative gaps.
pub fn average_interval_secs(timestamps: &SlidingWindow<u64>) -> f64 {
    if timestamps.len() < 2 {
        return 0.0;
    }
    let total_ms: f64 = timestamps
        .iter()
        .zip(timestamps.iter().skip(1))
        .map(|(prev, next)| *next as f64 - *prev as f64)
        .sum();
    total_ms / (timestamps.len() - 1) as f64 / 1000.0
}

/// Sum of the newest transaction counts over ten average intervals.
pub fn throughput(tx_counts: &SlidingWindow<u64>, average_interval: f64) -> f64 {
    if tx_counts.is_empty() || average_interval <= 0.0 {
        return 0.0;
    }
    let recent: u64 = tx_counts.last_n(THROUGHPUT_SAMPLES).sum();
    recent as f64 / (THROUGHPUT_SAMPLES as f64 * average_interval)
}

/// Mean difficulty of recent blocks over the average interval.
pub fn hash_rate(recent_difficulties: &[u64], average_interval: f64) -> f64 {
    if recent_difficulties.is_empty() || average_interval <= 0.0 {
        return 0.0;
    }
    let mean =
        recent_difficulties.iter().map(|d| *d as f64).sum::<f64>() / recent_difficulties.len() as f64;
    mean / average_interval
}

/// Assemble a full snapshot.
pub fn compute_metrics(
    timestamps: &SlidingWindow<u64>,
    tx_counts: &SlidingWindow<u64>,
    recent_difficulties: &[u64],
    pending_transactions: usize,
) -> ChainMetrics {
    let average = average_interval_secs(timestamps);
    ChainMetrics {
        average_block_time_secs: average,
        transactions_per_second: throughput(tx_counts, average),
        pending_transactions,
        hash_rate: hash_rate(recent_difficulties, average),
        confirmation_time_secs: average * CONFIRMATION_DEPTH,
    }
}
