//! HTTP point lookups.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;

use chainviz_telemetry::component::TRANSPORT;
use shared_types::{FetchedSnapshot, RawBlock, RawTransaction};

use crate::config::TransportConfig;
use crate::domain::TransportError;
use crate::ports::inbound::ChainFetcher;

/// Lookup client for the indexing service's HTTP API.
pub struct HttpFetcher {
    http_client: reqwest::Client,
    config: TransportConfig,
}

impl HttpFetcher {
    /// Create a fetcher whose requests time out after `connection_timeout_ms`.
    pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
        config.validate()?;
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| TransportError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransportError> {
        let url = self.config.http_url(path);
        debug!(component = TRANSPORT, %url, "GET");

        let response = self.http_client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(self.config.timeout())
            } else {
                TransportError::Request(e.to_string())
            }
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(TransportError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            return Err(TransportError::Status {
                code: status.as_u16(),
                path: path.to_string(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ChainFetcher for HttpFetcher {
    async fn fetch_snapshot(&self) -> Result<FetchedSnapshot, TransportError> {
        self.get_json("/api/snapshot").await
    }

    async fn fetch_latest_block(&self) -> Result<RawBlock, TransportError> {
        self.get_json("/api/blocks/latest").await
    }

    async fn fetch_block_by_number(&self, number: u64) -> Result<RawBlock, TransportError> {
        self.get_json(&format!("/api/blocks/{number}")).await
    }

    async fn fetch_transaction_by_hash(
        &self,
        hash: &str,
    ) -> Result<RawTransaction, TransportError> {
        self.get_json(&format!("/api/transactions/{hash}")).await
    }
}
