//! HTTP load-generation endpoint.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client ──▶ listener ──▶ request_log ──▶ router ─┬─▶ /stream1 ──▶ producer task
//!                              (IN)                 │                  │
//!                                                   ├─▶ /sleep         ▼
//!                                                   │             static payload
//!                                                   └─▶ 404       (shared Bytes)
//!   Client ◀── streaming body ◀── request_log (OUT, once the body is done)
//! ```
//!
//! Endpoints:
//! - `GET /stream1?chunk=<bytes>&count=<n>`: header, `count` × (0x00 + chunk), `OK`
//! - `GET /sleep`: acknowledgement, configured delay, `OK`

use std::path::PathBuf;

use clap::Parser;

use stream_endpoint::config::{loader::load_config, validation::validate_config, ServerConfig};
use stream_endpoint::lifecycle::{self, signals, Shutdown};
use stream_endpoint::observability::logging;

#[derive(Parser)]
#[command(name = "stream-endpoint")]
#[command(about = "Streams synthetic payloads for HTTP load testing", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
        validate_config(&config).map_err(|errors| {
            errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        })?;
    }

    logging::init_tracing(&config.observability);

    tracing::info!("stream-endpoint v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        sleep = ?config.delay.duration(),
        metrics_enabled = config.observability.metrics_enabled,
        "Configuration loaded"
    );

    let (server, listener) = match lifecycle::prepare(config).await {
        Ok(ready) => ready,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return Err(e.into());
        }
    };

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
