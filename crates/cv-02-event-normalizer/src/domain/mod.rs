//! # Domain Layer - Event Normalizer
//!
//! Pure decoding. No I/O, no bus.

pub mod errors;
pub mod message;

pub use errors::NormalizeError;
pub use message::{classify, decode, InboundMessage, MessageType};
