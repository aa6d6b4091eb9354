//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! request_log middleware, handlers, startup
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → Metrics endpoint (Prometheus scrape), when enabled
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every per-request event
//! - Metrics are cheap no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
