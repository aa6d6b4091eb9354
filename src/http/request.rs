//! Request identification and metadata extraction.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) per inbound request
//! - Capture the fields logged on entry and exit
//!
//! # Design Decisions
//! - Request ID assigned before the handler runs and stored in extensions
//! - Missing metadata (no peer address, no user agent) logs as `-`

use std::fmt;
use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::{header, Method, Request, Uri};
use uuid::Uuid;

/// Unique identifier for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generate a new random request ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Request fields recorded by the request log.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub id: RequestId,
    pub remote_addr: Option<SocketAddr>,
    pub method: Method,
    pub uri: Uri,
    pub user_agent: Option<String>,
}

impl RequestInfo {
    /// Capture metadata from a request, assigning it a fresh ID.
    pub fn capture<B>(req: &Request<B>) -> Self {
        let remote_addr = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        let user_agent = req
            .headers()
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        Self {
            id: RequestId::new(),
            remote_addr,
            method: req.method().clone(),
            uri: req.uri().clone(),
            user_agent,
        }
    }

    /// Peer address for display.
    pub fn remote(&self) -> String {
        self.remote_addr
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| "-".to_string())
    }

    /// User agent for display.
    pub fn agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or("-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ids_are_unique() {
        assert_ne!(RequestId::new(), RequestId::new());
    }

    #[test]
    fn captures_request_fields() {
        let addr: SocketAddr = "10.0.0.7:51000".parse().unwrap();
        let mut req = Request::builder()
            .method(Method::GET)
            .uri("/stream1?chunk=4&count=2")
            .header(header::USER_AGENT, "curl/8.5.0")
            .body(())
            .unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));

        let info = RequestInfo::capture(&req);
        assert_eq!(info.remote(), "10.0.0.7:51000");
        assert_eq!(info.method, Method::GET);
        assert_eq!(info.uri.to_string(), "/stream1?chunk=4&count=2");
        assert_eq!(info.agent(), "curl/8.5.0");
    }

    #[test]
    fn missing_metadata_displays_placeholder() {
        let req = Request::builder().uri("/sleep").body(()).unwrap();
        let info = RequestInfo::capture(&req);
        assert_eq!(info.remote(), "-");
        assert_eq!(info.agent(), "-");
    }
}
