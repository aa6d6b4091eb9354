//! Metrics collection and exposition.
//!
//! # Metrics
//! - `stream_endpoint_requests_total` (counter): requests by method, status
//! - `stream_endpoint_request_duration_seconds` (histogram): time until the
//!   response body finished, by method
//! - `stream_endpoint_stream_bytes_total` (counter): marker + payload bytes
//! - `stream_endpoint_streams_total` (counter): streams by outcome

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::StatusCode;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::http::stream::StreamOutcome;

/// Start the Prometheus exporter on `addr` and install it as the recorder.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record a finished request. `status` is `None` when no response was produced.
pub fn record_request(method: &str, status: Option<StatusCode>, elapsed: Duration) {
    let status = status
        .map(|s| s.as_u16().to_string())
        .unwrap_or_else(|| "none".to_string());

    metrics::counter!(
        "stream_endpoint_requests_total",
        "method" => method.to_string(),
        "status" => status
    )
    .increment(1);

    metrics::histogram!(
        "stream_endpoint_request_duration_seconds",
        "method" => method.to_string()
    )
    .record(elapsed.as_secs_f64());
}

/// Record how a `/stream1` body ended.
pub fn record_stream(outcome: &StreamOutcome) {
    metrics::counter!("stream_endpoint_stream_bytes_total").increment(outcome.bytes());
    metrics::counter!("stream_endpoint_streams_total", "outcome" => outcome.label()).increment(1);
}
