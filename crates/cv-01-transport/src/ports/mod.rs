//! # Ports Layer - Transport
//!
//! API the runtime drives: the push channel and one-shot lookups.

pub mod inbound;

pub use inbound::*;
