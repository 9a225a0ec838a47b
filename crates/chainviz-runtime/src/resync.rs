//! Snapshot resynchronization.
//!
//! The core rebuilds nothing on reconnect. A caller that wants a fresh view
//! fetches a snapshot and feeds it back through the bus as ordinary ingest
//! events, so the engine treats it like live traffic.

use tokio::sync::watch;
use tracing::{debug, info};

use chainviz_telemetry::component::RUNTIME;
use cv_01_transport::{ChainFetcher, TransportError};
use shared_bus::{ChainVizEvent, EventPublisher};
use shared_types::{FetchedSnapshot, TransactionStatus};

/// Publish a fetched snapshot. Returns the number of events published.
///
/// Order: latest block, then pending, then proposed transactions.
pub async fn apply_snapshot(fetched: FetchedSnapshot, bus: &dyn EventPublisher) -> usize {
    let mut published = 0;

    if let Some(block) = fetched.latest_block {
        bus.publish(ChainVizEvent::BlockFinalized(block)).await;
        published += 1;
    }

    let batches = [
        (TransactionStatus::Pending, fetched.pending_transactions),
        (TransactionStatus::Proposed, fetched.proposed_transactions),
    ];
    for (status, transactions) in batches {
        for tx in transactions.unwrap_or_default() {
            bus.publish(ChainVizEvent::transaction(status, tx)).await;
            published += 1;
            // Let plain subscribers drain between events of a large batch.
            tokio::task::yield_now().await;
        }
    }

    published
}

/// Fetch a snapshot and publish it unless shutdown began meanwhile.
pub async fn resync(
    fetcher: &dyn ChainFetcher,
    bus: &dyn EventPublisher,
    shutdown: &watch::Receiver<bool>,
) -> Result<usize, TransportError> {
    let fetched = fetcher.fetch_snapshot().await?;

    if *shutdown.borrow() {
        debug!(component = RUNTIME, "Ignoring snapshot that arrived after shutdown");
        return Ok(0);
    }

    let published = apply_snapshot(fetched, bus).await;
    info!(component = RUNTIME, events = published, "Snapshot resync applied");
    Ok(published)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cv_03_aggregation_engine::{AggregationService, ChainDataApi};
    use shared_bus::{EventFilter, EventKind, InMemoryEventBus};
    use std::sync::Arc;
    use shared_types::{RawBlock, RawTransaction};

    struct FixedFetcher(FetchedSnapshot);

    #[async_trait]
    impl ChainFetcher for FixedFetcher {
        async fn fetch_snapshot(&self) -> Result<FetchedSnapshot, TransportError> {
            Ok(self.0.clone())
        }

        async fn fetch_latest_block(&self) -> Result<RawBlock, TransportError> {
            self.0
                .latest_block
                .clone()
                .ok_or_else(|| TransportError::NotFound("/api/blocks/latest".to_string()))
        }

        async fn fetch_block_by_number(&self, number: u64) -> Result<RawBlock, TransportError> {
            Err(TransportError::NotFound(format!("/api/blocks/{number}")))
        }

        async fn fetch_transaction_by_hash(
            &self,
            hash: &str,
        ) -> Result<RawTransaction, TransportError> {
            Err(TransportError::NotFound(format!("/api/transactions/{hash}")))
        }
    }

    fn raw_tx(hash: &str) -> RawTransaction {
        RawTransaction {
            hash: hash.to_string(),
            timestamp: None,
            context: None,
        }
    }

    fn fetched() -> FetchedSnapshot {
        FetchedSnapshot {
            latest_block: Some(RawBlock {
                number: "10".to_string(),
                hash: "0xb10".to_string(),
                timestamp: "1700000000000".to_string(),
                miner: "0xminer".to_string(),
                reward: "1".to_string(),
                transaction_count: 0,
                proposals_count: None,
                uncles_count: None,
                transactions: Vec::new(),
            }),
            pending_transactions: Some(vec![raw_tx("p1"), raw_tx("p2")]),
            proposed_transactions: Some(vec![raw_tx("q1")]),
        }
    }

    #[tokio::test]
    async fn test_snapshot_republished_as_ingest_events() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::all());

        assert_eq!(apply_snapshot(fetched(), &bus).await, 4);

        let mut kinds = Vec::new();
        while let Ok(Some(event)) = sub.try_recv() {
            kinds.push(event.kind());
        }
        assert_eq!(
            kinds,
            vec![
                EventKind::BlockFinalized,
                EventKind::TransactionPending,
                EventKind::TransactionPending,
                EventKind::TransactionProposed,
            ]
        );
    }

    #[tokio::test]
    async fn test_large_snapshot_reaches_running_engine() {
        let bus = Arc::new(InMemoryEventBus::new());
        let engine = AggregationService::new(bus.clone());
        engine.start();

        let pending: Vec<_> = (0..1500).map(|i| raw_tx(&format!("p{i}"))).collect();
        let snapshot = FetchedSnapshot {
            latest_block: None,
            pending_transactions: Some(pending),
            proposed_transactions: None,
        };
        assert_eq!(apply_snapshot(snapshot, bus.as_ref()).await, 1500);

        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while engine.pending_transactions().len() < 1500 {
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        engine.teardown();
    }

    #[tokio::test]
    async fn test_empty_snapshot_publishes_nothing() {
        let bus = InMemoryEventBus::new();
        assert_eq!(apply_snapshot(FetchedSnapshot::default(), &bus).await, 0);
        assert_eq!(bus.events_published(), 0);
    }

    #[tokio::test]
    async fn test_late_snapshot_ignored_after_shutdown() {
        let bus = InMemoryEventBus::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        shutdown_tx.send_replace(true);

        let published = resync(&FixedFetcher(fetched()), &bus, &shutdown_rx).await.unwrap();
        assert_eq!(published, 0);
        assert_eq!(bus.events_published(), 0);
    }

    #[tokio::test]
    async fn test_resync_publishes_when_running() {
        let bus = InMemoryEventBus::new();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let published = resync(&FixedFetcher(fetched()), &bus, &shutdown_rx).await.unwrap();
        assert_eq!(published, 4);
    }
}
