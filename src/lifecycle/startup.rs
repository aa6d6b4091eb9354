//! Startup orchestration.
//!
//! # Responsibilities
//! - Generate the static payload
//! - Start the metrics exporter when enabled
//! - Bind the listener and build the server
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Steps run in order; the listener binds last

use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::http::HttpServer;
use crate::observability::metrics;
use crate::payload::{PayloadError, StaticPayload};

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to generate static payload: {0}")]
    Payload(#[from] PayloadError),

    #[error("invalid address `{0}`")]
    Address(String),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}

/// Run every startup step, returning a server ready to `run` on the listener.
pub async fn prepare(config: ServerConfig) -> Result<(HttpServer, TcpListener), StartupError> {
    let payload = StaticPayload::generate()?;
    tracing::info!(bytes = payload.len(), "Static payload ready");

    if config.observability.metrics_enabled {
        let addr = parse_addr(&config.observability.metrics_address)?;
        metrics::init_metrics(addr)?;
    }

    let address = parse_addr(&config.listener.bind_address)?;
    let listener = TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind { address, source })?;

    tracing::info!(
        address = %listener.local_addr().unwrap_or(address),
        "Listening for connections"
    );

    Ok((HttpServer::new(config, payload), listener))
}

fn parse_addr(raw: &str) -> Result<SocketAddr, StartupError> {
    raw.parse()
        .map_err(|_| StartupError::Address(raw.to_string()))
}
