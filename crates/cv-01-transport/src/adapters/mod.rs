//! # Adapters Layer - Transport
//!
//! - `ws`: push connection over tokio-tungstenite
//! - `http`: point lookups over reqwest

pub mod http;
pub mod ws;

pub use http::HttpFetcher;
pub use ws::WsTransport;
