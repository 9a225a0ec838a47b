//! # ChainViz
//!
//! Headless client core for the chain visualization dashboard.
//!
//! ## Usage
//!
//! ```bash
//! # Local indexing service (default http://localhost:8080)
//! chainviz
//!
//! # Remote service, resync from a snapshot after connecting
//! chainviz --base-url https://indexer.example.org --resync-on-start
//! ```
//!
//! Every flag falls back to its `CHAINVIZ_*` environment variable.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use chainviz_runtime::{ChainVizRuntime, RuntimeConfig};
use chainviz_telemetry::{component::RUNTIME, init_logging};

/// ChainViz client core
#[derive(Parser, Debug)]
#[command(name = "chainviz")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the indexing service
    #[arg(long)]
    base_url: Option<String>,

    /// Connect and request timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Do not open the push connection on startup
    #[arg(long)]
    no_auto_connect: bool,

    /// Seconds between metrics log lines (0 disables)
    #[arg(long, env = "CHAINVIZ_METRICS_INTERVAL_SECS")]
    metrics_interval_secs: Option<u64>,

    /// Fetch a snapshot after connecting
    #[arg(long, env = "CHAINVIZ_RESYNC_ON_START")]
    resync_on_start: bool,

    /// Emit JSON log lines
    #[arg(long)]
    json_logs: bool,
}

impl Args {
    fn apply(self, config: &mut RuntimeConfig) {
        if let Some(base_url) = self.base_url {
            config.transport.base_url = base_url;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.transport.connection_timeout_ms = timeout_ms;
        }
        if self.no_auto_connect {
            config.transport.auto_connect = false;
        }
        if let Some(secs) = self.metrics_interval_secs {
            config.metrics_interval_secs = secs;
        }
        if self.resync_on_start {
            config.resync_on_start = true;
        }
        if self.json_logs {
            config.telemetry.json_logs = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = RuntimeConfig::from_env().context("Invalid environment configuration")?;
    args.apply(&mut config);

    init_logging(&config.telemetry).context("Failed to initialize logging")?;

    let runtime = ChainVizRuntime::new(config)?;
    runtime.start().await?;

    info!(component = RUNTIME, "ChainViz is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    runtime.shutdown().await;
    Ok(())
}
