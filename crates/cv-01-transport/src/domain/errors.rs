//! Transport error types.

use std::time::Duration;
use thiserror::Error;

/// Invalid transport configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Base URL is empty")]
    EmptyBaseUrl,

    #[error("Base URL must use http or https: {0}")]
    UnsupportedScheme(String),

    #[error("Connection timeout cannot be 0")]
    ZeroTimeout,

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Failures surfaced to callers of transport operations.
///
/// Nothing here is retried automatically except the push connection itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to connect: {0}")]
    Connect(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Not connected")]
    NotConnected,

    #[error("Failed to send frame: {0}")]
    Send(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unexpected status {code} from {path}")]
    Status { code: u16, path: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),
}
