//! # Ports Layer - Aggregation Engine
//!
//! - `inbound`: read API the consumers drive
//! - `outbound`: time source the engine depends on

pub mod inbound;
pub mod outbound;
