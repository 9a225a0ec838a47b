//! Inbound ports (API).

use async_trait::async_trait;
use tokio::sync::watch;

use shared_types::{FetchedSnapshot, RawBlock, RawTransaction};

use crate::domain::{Channel, ConnectionState, TransportError};

/// Push connection to the indexing service.
///
/// Inbound frames are delivered through the channel handed to the
/// implementation at construction, never through this trait.
#[async_trait]
pub trait TransportChannel: Send + Sync {
    /// Open the connection. Succeeds immediately when already running.
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Close the connection and stop reconnecting. Idempotent.
    async fn disconnect(&mut self) -> Result<(), TransportError>;

    /// Join a channel. Remembered and replayed after every reconnect.
    async fn subscribe(&self, channel: Channel) -> Result<(), TransportError>;

    /// Leave a channel.
    async fn unsubscribe(&self, channel: Channel) -> Result<(), TransportError>;

    /// Current connection state.
    fn state(&self) -> ConnectionState;

    /// Receiver that observes every state change.
    fn watch_state(&self) -> watch::Receiver<ConnectionState>;
}

/// One-shot lookups against the indexing service. No retries.
#[async_trait]
pub trait ChainFetcher: Send + Sync {
    /// Latest block plus pending and proposed transactions.
    async fn fetch_snapshot(&self) -> Result<FetchedSnapshot, TransportError>;

    async fn fetch_latest_block(&self) -> Result<RawBlock, TransportError>;

    async fn fetch_block_by_number(&self, number: u64) -> Result<RawBlock, TransportError>;

    async fn fetch_transaction_by_hash(
        &self,
        hash: &str,
    ) -> Result<RawTransaction, TransportError>;
}
