//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, explicit router)
//!     → middleware/request_log.rs (request ID, IN log)
//!     → stream.rs | sleep.rs (handlers)
//!     → response.rs (producer task → streaming body)
//!     → middleware/request_log.rs (OUT log once the body is done)
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;
pub mod sleep;
pub mod stream;

pub use request::{RequestId, RequestInfo};
pub use server::{AppState, HttpServer};
pub use stream::{StreamOutcome, StreamParams};
