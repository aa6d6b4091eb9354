//! HTTP middleware layers.

pub mod request_log;

pub use request_log::{RequestLog, RequestLogLayer};
