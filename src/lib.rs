//! Synthetic payload streaming endpoint for HTTP load and transport testing.

pub mod client;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod payload;

pub use config::schema::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use payload::StaticPayload;
