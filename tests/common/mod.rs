//! Shared utilities for integration and load testing.

use std::net::SocketAddr;
use std::time::Duration;

use stream_endpoint::{HttpServer, ServerConfig, Shutdown, StaticPayload};
use tokio::net::TcpListener;

/// A server running on an ephemeral local port.
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a server whose `/sleep` waits for `sleep`.
pub async fn start_server(sleep: Duration) -> TestServer {
    let mut config = ServerConfig::default();
    config.delay.sleep_secs = sleep.as_secs();
    config.delay.sleep_millis = sleep.subsec_millis() as u64;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config, StaticPayload::generate().unwrap());

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestServer { addr, shutdown }
}

/// Client that never reuses connections between tests.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Fetch a full body, returning status and bytes.
#[allow(dead_code)]
pub async fn get_bytes(url: &str) -> (u16, Vec<u8>) {
    let res = client().get(url).send().await.expect("server unreachable");
    let status = res.status().as_u16();
    let body = res.bytes().await.unwrap().to_vec();
    (status, body)
}
