//! Normalizer service: frames in, bus events out.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use chainviz_telemetry::component::NORMALIZER;
use cv_01_transport::TransportEvent;
use shared_bus::{ChainVizEvent, EventPublisher};

use crate::domain::classify;

/// Frame counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizerStats {
    /// Frames classified and published.
    pub processed: u64,
    /// Frames dropped because they failed to classify.
    pub dropped: u64,
}

/// Classifies raw frames and publishes the resulting events.
pub struct EventNormalizer {
    bus: Arc<dyn EventPublisher>,
    processed: AtomicU64,
    dropped: AtomicU64,
}

impl EventNormalizer {
    pub fn new(bus: Arc<dyn EventPublisher>) -> Self {
        Self {
            bus,
            processed: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Classify one frame and publish it.
    ///
    /// Returns the published event, or `None` when the frame was dropped.
    /// Never fails: a bad frame is logged with its full text.
    pub async fn ingest(&self, text: &str) -> Option<ChainVizEvent> {
        match classify(text) {
            Ok(event) => {
                self.processed.fetch_add(1, Ordering::Relaxed);
                debug!(component = NORMALIZER, event = event.name(), "Frame classified");
                self.bus.publish(event.clone()).await;
                Some(event)
            }
            Err(e) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(component = NORMALIZER, error = %e, message = %text, "Dropping inbound frame");
                None
            }
        }
    }

    /// Handle one transport event.
    pub async fn handle(&self, event: TransportEvent) {
        match event {
            TransportEvent::Frame(text) => {
                self.ingest(&text).await;
            }
            TransportEvent::Disconnected(reason) => {
                info!(component = NORMALIZER, %reason, "Feed disconnected");
                self.bus.publish(ChainVizEvent::Disconnected { reason }).await;
            }
        }
    }

    /// Drain transport events until the sender side closes.
    pub async fn run(&self, mut events: mpsc::Receiver<TransportEvent>) {
        while let Some(event) = events.recv().await {
            self.handle(event).await;
        }
        debug!(component = NORMALIZER, "Transport event stream closed");
    }

    #[must_use]
    pub fn stats(&self) -> NormalizerStats {
        NormalizerStats {
            processed: self.processed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}
