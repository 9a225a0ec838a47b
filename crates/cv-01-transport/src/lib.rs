//! # Transport Channel
//!
//! Duplex connection to the remote indexing service.
//!
//! ## Purpose
//!
//! - Keep a WebSocket open to the push endpoint, reconnecting with
//!   exponential backoff when it drops.
//! - Subscribe/unsubscribe to the `chain` and `transactions` channels and
//!   replay active subscriptions after every reconnect.
//! - Forward every inbound text frame, untouched, to whoever normalizes them.
//! - Serve one-shot HTTP lookups (snapshot, latest block, block by number,
//!   transaction by hash).
//!
//! The transport rebuilds no chain state. Consumers decide whether to
//! request a fresh snapshot after a reconnect.
//!
//! ## Module Structure
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  adapters/ws.rs   - WsTransport (tokio-tungstenite)             │
//! │  adapters/http.rs - HttpFetcher (reqwest)                       │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/inbound.rs - TransportChannel, ChainFetcher traits       │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  domain/types.rs  - Channel, ConnectionState, TransportEvent    │
//! │  domain/errors.rs - TransportError, ConfigError                 │
//! │  config.rs        - TransportConfig                             │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;

pub use adapters::{HttpFetcher, WsTransport};
pub use config::TransportConfig;
pub use domain::*;
pub use ports::inbound::{ChainFetcher, TransportChannel};
