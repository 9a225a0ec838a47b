//! # ChainViz Telemetry
//!
//! Structured logging for every ChainViz component.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chainviz_telemetry::{init_logging, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_logging(&config)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CHAINVIZ_LOG` / `RUST_LOG` | `info` | Log filter directive |
//! | `CHAINVIZ_JSON_LOGS` | `false` | Emit one JSON object per line |
//! | `CHAINVIZ_LOG_TARGETS` | `true` | Include the module target |

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::init_logging;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter {directive:?}: {reason}")]
    InvalidFilter { directive: String, reason: String },

    #[error("A global tracing subscriber is already installed")]
    AlreadyInitialized,
}

/// Name used as the `component` field by the logging macros.
pub mod component {
    pub const TRANSPORT: &str = "transport";
    pub const NORMALIZER: &str = "normalizer";
    pub const ENGINE: &str = "engine";
    pub const RUNTIME: &str = "runtime";
}
