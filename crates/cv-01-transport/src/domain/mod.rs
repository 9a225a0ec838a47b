//! # Domain Layer - Transport
//!
//! - `types`: channels, control frames, connection state, transport events
//! - `errors`: TransportError and ConfigError

pub mod errors;
pub mod types;

pub use errors::*;
pub use types::*;
