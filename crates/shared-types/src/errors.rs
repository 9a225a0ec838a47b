//! # Error Types
//!
//! Defines error types shared across crates.

use thiserror::Error;

/// Errors produced when an amount string cannot be read exactly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    /// Not an unsigned decimal integer.
    #[error("Not a decimal integer: {0:?}")]
    NotDecimal(String),

    /// Wider than 256 bits.
    #[error("Amount overflows 256 bits: {0}")]
    Overflow(String),
}
