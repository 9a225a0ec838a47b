//! # Shared Types Crate
//!
//! This crate contains the records that flow between the transport, the
//! event normalizer, the aggregation engine and every rendering consumer.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-crate types are defined here.
//! - **Exact Amounts**: Monetary values are `U256`, parsed from decimal
//!   strings. Floating point never touches a reward, value or fee.
//! - **Owned Copies**: Derived records are plain data. Consumers always hold
//!   their own clone, never a reference into engine state.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
