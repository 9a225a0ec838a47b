//! # ChainViz Runtime Library
//!
//! Wires the client core together. The `chainviz` binary is a thin CLI on
//! top of [`ChainVizRuntime`].
//!
//! ```text
//! WsTransport ──frames──▶ EventNormalizer ──ingest events──▶ Event Bus
//!                                                              │   ▲
//!                                          AggregationService ◀┘   │
//!                                                  │               │
//!                                                  └─processed─────┘
//!                                                                  │
//!                                                      UiStateMirror
//! ```
//!
//! - `config` - environment and CLI configuration
//! - `adapters/` - consumer adapters (UI-state mirror)
//! - `resync` - snapshot fetch fed back through the bus
//! - `runtime` - startup and shutdown sequencing

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod config;
pub mod resync;
pub mod runtime;

pub use config::RuntimeConfig;
pub use runtime::ChainVizRuntime;
