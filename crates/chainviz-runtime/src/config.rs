//! # Runtime Configuration
//!
//! Environment first, command line on top.

use std::time::Duration;

use chainviz_telemetry::TelemetryConfig;
use cv_01_transport::{ConfigError, TransportConfig};

/// Complete runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Transport configuration.
    pub transport: TransportConfig,
    /// Logging configuration.
    pub telemetry: TelemetryConfig,
    /// Seconds between metrics log lines. Zero disables them.
    pub metrics_interval_secs: u64,
    /// Fetch a snapshot right after connecting and feed it through the bus.
    pub resync_on_start: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            telemetry: TelemetryConfig::default(),
            metrics_interval_secs: 30,
            resync_on_start: false,
        }
    }
}

impl RuntimeConfig {
    /// Load from `CHAINVIZ_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            transport: TransportConfig::from_env()?,
            telemetry: TelemetryConfig::from_env(),
            ..Default::default()
        })
    }

    /// Validate, returning warnings for questionable values.
    pub fn validate(&self) -> Result<Vec<String>, ConfigError> {
        let mut warnings = self.transport.validate()?;
        if self.resync_on_start && !self.transport.auto_connect {
            warnings.push("resync_on_start has no effect without auto_connect".to_string());
        }
        Ok(warnings)
    }

    /// `None` when periodic metrics logging is disabled.
    pub fn metrics_interval(&self) -> Option<Duration> {
        (self.metrics_interval_secs > 0).then(|| Duration::from_secs(self.metrics_interval_secs))
    }
}
