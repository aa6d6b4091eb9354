//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with all handlers
//! - Wire up the request log middleware
//! - Bind server to listener
//! - Stop accepting on the shutdown signal

use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::config::ServerConfig;
use crate::http::middleware::RequestLogLayer;
use crate::http::{sleep, stream};
use crate::payload::StaticPayload;

/// Application state injected into handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    pub payload: StaticPayload,
    pub sleep: Duration,
}

/// HTTP server for the stream endpoint.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and payload.
    pub fn new(config: ServerConfig, payload: StaticPayload) -> Self {
        let state = AppState {
            payload,
            sleep: config.delay.duration(),
        };

        let router = Self::build_router(state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/stream1", get(stream::stream1))
            .route("/sleep", get(sleep::sleep))
            .fallback(not_found)
            .with_state(state)
            .layer(RequestLogLayer)
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            sleep = ?self.config.delay.duration(),
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "not found")
}
