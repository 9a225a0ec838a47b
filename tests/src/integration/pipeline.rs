//! # Pipeline Flows
//!
//! Raw frames in, display state out, with every hop going over the bus:
//!
//! 1. **Normalizer → Bus**: frames become ingest events
//! 2. **Bus → Engine**: ingest events become processed events and metrics
//! 3. **Bus → UI mirror**: processed events land in display state

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::sync::watch;
    use tokio::task::JoinHandle;
    use tokio::time::timeout;

    use chainviz_runtime::adapters::{UiStateHandle, UiStateMirror};
    use cv_01_transport::{ConnectionState, TransportEvent};
    use cv_02_event_normalizer::EventNormalizer;
    use cv_03_aggregation_engine::{AggregationService, ChainDataApi};
    use shared_bus::{ChainVizEvent, EventFilter, EventKind, InMemoryEventBus};
    use shared_types::TransactionStatus;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    const GENESIS_MS: u64 = 1_700_000_000_000;

    struct Pipeline {
        bus: Arc<InMemoryEventBus>,
        normalizer: EventNormalizer,
        engine: AggregationService,
        ui: UiStateHandle,
        _connection: watch::Sender<ConnectionState>,
        mirror: JoinHandle<()>,
    }

    impl Pipeline {
        fn start() -> Self {
            let bus = Arc::new(InMemoryEventBus::new());
            let engine = AggregationService::new(Arc::clone(&bus));
            engine.start();

            let mirror = UiStateMirror::new(&bus);
            let ui = mirror.handle();
            let (connection, connection_rx) = watch::channel(ConnectionState::Connected);
            let mirror = tokio::spawn(mirror.run(connection_rx));

            Self {
                normalizer: EventNormalizer::new(bus.clone()),
                bus,
                engine,
                ui,
                _connection: connection,
                mirror,
            }
        }
    }

    impl Drop for Pipeline {
        fn drop(&mut self) {
            self.mirror.abort();
        }
    }

    fn block_frame(number: u64, tx_count: u64) -> String {
        format!(
            r#"{{"channel":"chain","type":"block.finalized","payload":{{"number":"{number}","hash":"0xb{number}","timestamp":"{ts}","miner":"0xminer","reward":"2000000000000000000","transactionCount":{tx_count},"transactions":[]}}}}"#,
            ts = GENESIS_MS + number * 10_000,
        )
    }

    fn tx_frame(status: &str, hash: &str) -> String {
        format!(
            r#"{{"channel":"transactions","type":"transaction.{status}","payload":{{"hash":"{hash}","timestamp":"{GENESIS_MS}"}}}}"#
        )
    }

    /// Poll until `check` holds or a second passes.
    async fn eventually<F: Fn() -> bool>(check: F) {
        timeout(Duration::from_secs(1), async {
            while !check() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    // =============================================================================
    // BLOCK FLOW
    // =============================================================================

    #[tokio::test]
    async fn test_blocks_flow_to_engine_and_display() {
        let pipeline = Pipeline::start();

        for number in 1..=3 {
            let event = pipeline.normalizer.ingest(&block_frame(number, 5)).await;
            assert_eq!(event.map(|e| e.kind()), Some(EventKind::BlockFinalized));
        }

        eventually(|| pipeline.ui.snapshot().recent_blocks.len() == 3).await;

        let blocks = pipeline.engine.recent_blocks(10);
        let numbers: Vec<_> = blocks.iter().map(|b| b.number).collect();
        assert_eq!(numbers, vec![Some(3), Some(2), Some(1)]);

        let metrics = pipeline.engine.metrics();
        assert!((metrics.average_block_time_secs - 10.0).abs() < f64::EPSILON);
        assert!((metrics.transactions_per_second - 0.15).abs() < 1e-9);
        assert!((metrics.confirmation_time_secs - 60.0).abs() < f64::EPSILON);

        eventually(|| pipeline.ui.snapshot().metrics == Some(metrics)).await;
        let ui = pipeline.ui.snapshot();
        assert_eq!(ui.recent_blocks[0].hash, "0xb3");
        assert!(ui.connected());
    }

    #[tokio::test]
    async fn test_redelivered_block_replaces_record() {
        let pipeline = Pipeline::start();

        pipeline.normalizer.ingest(&block_frame(7, 1)).await;
        pipeline.normalizer.ingest(&block_frame(7, 1)).await;

        eventually(|| pipeline.engine.snapshot().blocks.len() == 1).await;
        eventually(|| pipeline.ui.snapshot().recent_blocks.len() == 1).await;
        assert!(pipeline.engine.block_by_hash("0xb7").is_some());
    }

    // =============================================================================
    // TRANSACTION LIFECYCLE
    // =============================================================================

    #[tokio::test]
    async fn test_transaction_lifecycle() {
        let pipeline = Pipeline::start();
        let status_of = |hash: &str| pipeline.engine.transaction_by_hash(hash).map(|t| t.status);

        pipeline.normalizer.ingest(&tx_frame("pending", "0xt1")).await;
        eventually(|| status_of("0xt1") == Some(TransactionStatus::Pending)).await;
        assert_eq!(pipeline.engine.pending_transactions().len(), 1);

        pipeline.normalizer.ingest(&tx_frame("proposed", "0xt1")).await;
        eventually(|| status_of("0xt1") == Some(TransactionStatus::Proposed)).await;
        assert!(pipeline.engine.pending_transactions().is_empty());

        pipeline.normalizer.ingest(&tx_frame("rejected", "0xt1")).await;
        eventually(|| status_of("0xt1").is_none()).await;

        eventually(|| {
            let ui = pipeline.ui.snapshot();
            ui.removed_transactions == 1 && ui.recent_transactions.is_empty()
        })
        .await;
    }

    #[tokio::test]
    async fn test_rejection_of_unknown_transaction_still_announced() {
        let pipeline = Pipeline::start();
        let mut removed = pipeline
            .bus
            .subscribe(EventFilter::kinds(vec![EventKind::TransactionRemoved]));

        pipeline.normalizer.ingest(&tx_frame("rejected", "0xghost")).await;

        let event = timeout(Duration::from_secs(1), removed.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(
            event,
            ChainVizEvent::TransactionRemoved { ref hash } if hash == "0xghost"
        ));
        assert_eq!(pipeline.engine.snapshot().transactions.len(), 0);
    }

    // =============================================================================
    // FAULT ISOLATION
    // =============================================================================

    #[tokio::test]
    async fn test_bad_frames_dropped_without_stalling() {
        let pipeline = Pipeline::start();

        assert!(pipeline.normalizer.ingest("{not json").await.is_none());
        assert!(pipeline
            .normalizer
            .ingest(r#"{"channel":"chain","type":"block.orphaned","payload":{}}"#)
            .await
            .is_none());
        // Reward that overflows 256 bits passes the normalizer but not the engine.
        let overflow = block_frame(1, 0).replace("2000000000000000000", &"9".repeat(90));
        assert!(pipeline.normalizer.ingest(&overflow).await.is_some());

        pipeline.normalizer.ingest(&block_frame(2, 0)).await;
        eventually(|| pipeline.engine.recent_blocks(10).len() == 1).await;
        assert_eq!(pipeline.engine.recent_blocks(10)[0].hash, "0xb2");

        let stats = pipeline.normalizer.stats();
        assert_eq!(stats.dropped, 2);
        assert_eq!(stats.processed, 2);
    }

    #[tokio::test]
    async fn test_disconnect_reaches_display() {
        let pipeline = Pipeline::start();

        pipeline
            .normalizer
            .handle(TransportEvent::Disconnected("connection reset".to_string()))
            .await;

        eventually(|| {
            pipeline.ui.snapshot().last_disconnect.as_deref() == Some("connection reset")
        })
        .await;
    }

    // =============================================================================
    // TEARDOWN
    // =============================================================================

    #[tokio::test]
    async fn test_teardown_stops_aggregation() {
        let pipeline = Pipeline::start();

        pipeline.normalizer.ingest(&block_frame(1, 0)).await;
        eventually(|| pipeline.engine.recent_blocks(10).len() == 1).await;

        pipeline.engine.teardown();
        assert!(!pipeline.engine.is_running());

        pipeline.normalizer.ingest(&block_frame(2, 0)).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(pipeline.engine.recent_blocks(10).len(), 1);
    }
}
