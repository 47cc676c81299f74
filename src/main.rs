//! Binary entry point.
//!
//! Runs the collector as a standalone sidecar, emitting batches as JSON
//! lines on stdout. Core functionality lives in the `slowlog_collector`
//! library crate.

use clap::Parser;
use slowlog_collector::{Collector, CollectorConfig, JsonLinesSink};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Slow-query log collector for managed MySQL servers.
#[derive(Parser, Debug)]
#[command(name = "slowlog-collector", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        default_value = "configs/config.yaml",
        env = "SLOWLOG_COLLECTOR_CONFIG"
    )]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,slowlog_collector=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    tracing::info!("Loading configuration from: {}", cli.config);
    let config = CollectorConfig::load(&cli.config)?;
    tracing::info!(
        servers = config.servers.len(),
        interval_secs = config.emit_interval,
        "Configuration loaded"
    );

    let handle = Collector::new(config, JsonLinesSink)?.start()?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");

    // stop() blocks on the worker; keep it off the async runtime.
    tokio::task::spawn_blocking(move || handle.stop()).await?;
    Ok(())
}
