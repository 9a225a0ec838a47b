//! The runtime orchestrating every component.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use chainviz_telemetry::component::RUNTIME;
use cv_01_transport::{
    Channel, ConnectionState, HttpFetcher, TransportChannel, TransportEvent, WsTransport,
};
use cv_02_event_normalizer::EventNormalizer;
use cv_03_aggregation_engine::{AggregationService, ChainDataApi};
use shared_bus::InMemoryEventBus;

use crate::adapters::{UiStateHandle, UiStateMirror};
use crate::config::RuntimeConfig;
use crate::resync;

/// Buffered frames between the transport and the normalizer.
const TRANSPORT_CHANNEL_CAPACITY: usize = 256;

/// Every component of the client core, wired onto one bus.
pub struct ChainVizRuntime {
    config: RuntimeConfig,
    bus: Arc<InMemoryEventBus>,
    engine: Arc<AggregationService>,
    normalizer: Arc<EventNormalizer>,
    transport: Mutex<WsTransport>,
    fetcher: Arc<HttpFetcher>,
    ui_state: UiStateHandle,
    pending: parking_lot::Mutex<Option<Pending>>,
    tasks: parking_lot::Mutex<Vec<JoinHandle<()>>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

/// Pieces consumed by `start`.
struct Pending {
    transport_rx: mpsc::Receiver<TransportEvent>,
    mirror: UiStateMirror,
}

impl ChainVizRuntime {
    /// Build every component. Nothing runs until [`Self::start`].
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        for warning in config.validate().context("Invalid configuration")? {
            warn!(component = RUNTIME, "{}", warning);
        }

        let bus = Arc::new(InMemoryEventBus::new());
        let engine = Arc::new(AggregationService::new(Arc::clone(&bus)));
        let normalizer = Arc::new(EventNormalizer::new(bus.clone()));

        let (transport_tx, transport_rx) = mpsc::channel(TRANSPORT_CHANNEL_CAPACITY);
        let transport = WsTransport::new(config.transport.clone(), transport_tx)
            .context("Failed to create transport")?;
        let fetcher =
            HttpFetcher::new(config.transport.clone()).context("Failed to create HTTP fetcher")?;

        let mirror = UiStateMirror::new(&bus);
        let ui_state = mirror.handle();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config,
            bus,
            engine,
            normalizer,
            transport: Mutex::new(transport),
            fetcher: Arc::new(fetcher),
            ui_state,
            pending: parking_lot::Mutex::new(Some(Pending {
                transport_rx,
                mirror,
            })),
            tasks: parking_lot::Mutex::new(Vec::new()),
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Start the runtime.
    ///
    /// ## Startup Sequence
    ///
    /// 1. Start the aggregation engine
    /// 2. Spawn the normalizer loop
    /// 3. Spawn the UI-state mirror
    /// 4. Subscribe both channels and connect (when auto-connect is on)
    /// 5. Optional snapshot resync
    /// 6. Periodic metrics log
    pub async fn start(&self) -> Result<()> {
        let pending = self.pending.lock().take();
        let Some(Pending {
            transport_rx,
            mirror,
        }) = pending
        else {
            warn!(component = RUNTIME, "Runtime already started");
            return Ok(());
        };

        info!(component = RUNTIME, base_url = %self.config.transport.base_url, "Starting ChainViz runtime");

        // Step 1: engine
        self.engine.start();

        // Step 2: normalizer
        let normalizer = Arc::clone(&self.normalizer);
        self.spawn_until_shutdown("normalizer", async move {
            normalizer.run(transport_rx).await;
        });

        // Step 3: UI mirror
        let connection = self.transport.lock().await.watch_state();
        self.spawn_until_shutdown("ui-state", mirror.run(connection));

        // Step 4: transport
        {
            let mut transport = self.transport.lock().await;
            for channel in Channel::ALL {
                transport
                    .subscribe(channel)
                    .await
                    .with_context(|| format!("Failed to subscribe to {channel}"))?;
            }
            if self.config.transport.auto_connect {
                transport
                    .connect()
                    .await
                    .context("Failed to connect to the indexing service")?;
            } else {
                info!(component = RUNTIME, "Auto-connect disabled");
            }
        }

        // Step 5: resync
        if self.config.resync_on_start && self.config.transport.auto_connect {
            let fetcher = Arc::clone(&self.fetcher);
            let bus = Arc::clone(&self.bus);
            let shutdown = self.shutdown_rx.clone();
            self.spawn_until_shutdown("resync", async move {
                if let Err(e) = resync::resync(fetcher.as_ref(), bus.as_ref(), &shutdown).await {
                    warn!(component = RUNTIME, error = %e, "Snapshot resync failed");
                }
            });
        }

        // Step 6: metrics log
        if let Some(period) = self.config.metrics_interval() {
            let engine = Arc::clone(&self.engine);
            let ui_state = self.ui_state.clone();
            self.spawn_until_shutdown("metrics-log", log_metrics(engine, ui_state, period));
        }

        info!(component = RUNTIME, "ChainViz runtime running");
        Ok(())
    }

    fn spawn_until_shutdown<F>(&self, name: &'static str, task: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let mut shutdown = self.shutdown_rx.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = task => {}
                _ = shutdown.changed() => {
                    info!(component = RUNTIME, task = name, "Shutdown signal received");
                }
            }
        });
        self.tasks.lock().push(handle);
    }

    /// Stop in reverse startup order. Idempotent.
    pub async fn shutdown(&self) {
        if *self.shutdown_rx.borrow() {
            return;
        }
        info!(component = RUNTIME, "Initiating graceful shutdown...");

        self.shutdown_tx.send_replace(true);

        if let Err(e) = self.transport.lock().await.disconnect().await {
            error!(component = RUNTIME, error = %e, "Transport disconnect failed");
        }
        self.engine.teardown();

        let tasks: Vec<JoinHandle<()>> = self.tasks.lock().drain(..).collect();
        for task in tasks {
            if tokio::time::timeout(Duration::from_secs(2), task).await.is_err() {
                warn!(component = RUNTIME, "Task did not stop in time");
            }
        }

        let stats = self.normalizer.stats();
        info!(
            component = RUNTIME,
            frames_processed = stats.processed,
            frames_dropped = stats.dropped,
            "Shutdown complete"
        );
    }

    pub fn bus(&self) -> Arc<InMemoryEventBus> {
        Arc::clone(&self.bus)
    }

    /// Read access to engine state.
    pub fn engine(&self) -> Arc<AggregationService> {
        Arc::clone(&self.engine)
    }

    pub fn ui_state(&self) -> UiStateHandle {
        self.ui_state.clone()
    }

    pub async fn connection_state(&self) -> ConnectionState {
        self.transport.lock().await.state()
    }
}

async fn log_metrics(engine: Arc<AggregationService>, ui_state: UiStateHandle, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    // The first tick fires immediately.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let metrics = engine.metrics();
        let ui = ui_state.snapshot();
        info!(
            component = RUNTIME,
            connection = %ui.connection,
            avg_block_time_secs = metrics.average_block_time_secs,
            tps = metrics.transactions_per_second,
            pending = metrics.pending_transactions,
            hash_rate = metrics.hash_rate,
            confirmation_secs = metrics.confirmation_time_secs,
            recent_blocks = ui.recent_blocks.len(),
            "Chain metrics"
        );
    }
}
