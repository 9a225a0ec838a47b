//! Structured logging.
//!
//! Every line carries consistent fields so a log pipeline can index them:
//! - `component`: transport, normalizer, engine or runtime
//! - `block_hash` / `block_number` for block events
//! - `tx_hash` / `status` for transaction events

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{TelemetryConfig, TelemetryError};

/// Install the global `tracing` subscriber.
///
/// Returns [`TelemetryError::AlreadyInitialized`] instead of panicking when a
/// subscriber is already installed (tests commonly race on this).
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = build_filter(&config.log_level)?;

    let result = if config.json_logs {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(config.with_target)
            .with_current_span(false);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .try_init()
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(config.with_target)
            .with_thread_ids(false)
            .with_ansi(true);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
    };

    result.map_err(|_| TelemetryError::AlreadyInitialized)?;

    tracing::debug!(
        log_level = %config.log_level,
        json_logs = config.json_logs,
        "Structured logging configured"
    );
    Ok(())
}

fn build_filter(directive: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(directive).map_err(|e| TelemetryError::InvalidFilter {
        directive: directive.to_string(),
        reason: e.to_string(),
    })
}

/// Log a block-related event with standard fields.
#[macro_export]
macro_rules! log_block_event {
    ($level:ident, $component:expr, $msg:expr, $block_hash:expr, $block_number:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = $component,
            block_hash = %$block_hash,
            block_number = ?$block_number,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a transaction-related event with standard fields.
#[macro_export]
macro_rules! log_tx_event {
    ($level:ident, $component:expr, $msg:expr, $tx_hash:expr, $status:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = $component,
            tx_hash = %$tx_hash,
            status = %$status,
            $($($field)*,)?
            $msg
        )
    };
}
