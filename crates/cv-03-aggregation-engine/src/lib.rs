//! # Aggregation Engine
//!
//! Turns the normalized event stream into bounded, queryable state.
//!
//! ## Responsibilities
//!
//! - Keep one `ProcessedBlock` per block hash and one `ProcessedTransaction`
//!   per transaction hash, in insertion order.
//! - Keep two sliding windows of 100 entries (block timestamps and block
//!   transaction counts) and derive live metrics from them.
//! - Republish processed records, removals and metric snapshots.
//!
//! ## Failure Semantics
//!
//! A bad event is logged with its payload and dropped. State stays at its
//! last good value and the next event is processed normally. Nothing is
//! retried.
//!
//! ## Ownership
//!
//! The engine alone mutates its maps and windows. Every accessor returns an
//! owned copy.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{
    ChainAggregator, EngineError, SlidingWindow, CONFIRMATION_DEPTH, SNAPSHOT_BLOCKS,
    SNAPSHOT_TRANSACTIONS, THROUGHPUT_SAMPLES, WINDOW_CAPACITY,
};
pub use ports::inbound::ChainDataApi;
pub use ports::outbound::{SystemTimeSource, TimeSource};
pub use service::AggregationService;
