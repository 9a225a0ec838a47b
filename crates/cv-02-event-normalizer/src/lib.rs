//! # Event Normalizer
//!
//! Turns raw feed frames into typed bus events.
//!
//! Every inbound frame has the shape `{ channel, type, payload }`. The
//! normalizer decodes it into a closed [`InboundMessage`], attaches a
//! transaction status derived purely from the message type, and publishes
//! the matching [`shared_bus::ChainVizEvent`].
//!
//! Each frame is isolated: a frame that fails to decode is logged with its
//! text and dropped, and the next frame is handled normally.
//!
//! | Message type            | Channel        | Bus event               |
//! |-------------------------|----------------|-------------------------|
//! | `block.finalized`       | `chain`        | `block-finalized`       |
//! | `transaction.pending`   | `transactions` | `transaction-pending`   |
//! | `transaction.proposed`  | `transactions` | `transaction-proposed`  |
//! | `transaction.confirmed` | `transactions` | `transaction-confirmed` |
//! | `transaction.rejected`  | `transactions` | `transaction-rejected`  |

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod domain;
pub mod service;

pub use domain::{classify, decode, InboundMessage, MessageType, NormalizeError};
pub use service::{EventNormalizer, NormalizerStats};
