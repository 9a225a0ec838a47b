//! Transport configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::ConfigError;

/// Connection parameters for the remote indexing service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Base URL for HTTP lookups; the push endpoint is derived from it.
    pub base_url: String,
    /// Connect and request timeout in milliseconds.
    pub connection_timeout_ms: u64,
    /// Open the push connection as soon as the runtime starts.
    pub auto_connect: bool,
    /// Reconnect attempts after a dropped connection before giving up.
    pub max_reconnect_attempts: u32,
    /// Base delay for exponential reconnect backoff.
    pub reconnect_base_delay_ms: u64,
    /// Ceiling for the reconnect delay.
    pub reconnect_max_delay_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            connection_timeout_ms: 10_000,
            auto_connect: true,
            max_reconnect_attempts: 10,
            reconnect_base_delay_ms: 2_000,
            reconnect_max_delay_ms: 60_000,
        }
    }
}

impl TransportConfig {
    /// Defaults overridden by `CHAINVIZ_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("CHAINVIZ_BASE_URL") {
            config.base_url = url;
        }
        if let Some(value) = lookup("CHAINVIZ_TIMEOUT_MS") {
            config.connection_timeout_ms = parse_var("CHAINVIZ_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = lookup("CHAINVIZ_AUTO_CONNECT") {
            config.auto_connect = parse_bool("CHAINVIZ_AUTO_CONNECT", &value)?;
        }
        if let Some(value) = lookup("CHAINVIZ_MAX_RECONNECTS") {
            config.max_reconnect_attempts = parse_var("CHAINVIZ_MAX_RECONNECTS", &value)?;
        }

        Ok(config)
    }

    /// Validate configuration, returning warnings for questionable values.
    pub fn validate(&self) -> Result<Vec<String>, ConfigError> {
        let mut warnings = Vec::new();

        let url = self.base_url.trim();
        if url.is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::UnsupportedScheme(self.base_url.clone()));
        }

        if self.connection_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.connection_timeout_ms < 1_000 {
            warnings.push(format!(
                "connection_timeout_ms = {} is very short, connects may fail spuriously",
                self.connection_timeout_ms
            ));
        }

        if self.reconnect_base_delay_ms > self.reconnect_max_delay_ms {
            warnings.push(format!(
                "reconnect_base_delay_ms ({}) exceeds reconnect_max_delay_ms ({})",
                self.reconnect_base_delay_ms, self.reconnect_max_delay_ms
            ));
        }

        Ok(warnings)
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    /// Push endpoint: `http` becomes `ws`, `https` becomes `wss`, path `/ws`.
    #[must_use]
    pub fn ws_url(&self) -> String {
        let base = self.base_url.trim().trim_end_matches('/');
        let swapped = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        format!("{swapped}/ws")
    }

    /// Absolute URL for an HTTP lookup path.
    #[must_use]
    pub fn http_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim().trim_end_matches('/'), path)
    }

    /// Delay before reconnect attempt `attempt` (1-based).
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(6);
        let delay = self.reconnect_base_delay_ms.saturating_mul(factor);
        Duration::from_millis(delay.min(self.reconnect_max_delay_ms))
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}
