//! Shared test utilities for parley-server integration tests

pub mod client;

use std::net::SocketAddr;
use std::sync::Arc;

use parley_server::{AppState, ParleyServer, ServerConfig};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// A running server bound to an ephemeral loopback port
#[allow(dead_code)]
pub struct TestServer {
    pub state: Arc<AppState>,
    pub addr: SocketAddr,
    pub shutdown: CancellationToken,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Creates a test server with default config
#[allow(dead_code)]
pub async fn create_test_server() -> TestServer {
    create_test_server_with_config(ServerConfig::new("127.0.0.1", 0)).await
}

/// Creates a test server with custom config
#[allow(dead_code)]
pub async fn create_test_server_with_config(config: ServerConfig) -> TestServer {
    let state = Arc::new(AppState::new(config));
    let server = ParleyServer::with_state(Arc::clone(&state));
    let shutdown = server.shutdown_token();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = server.run_with_listener(listener).await;
    });

    // Brief delay to ensure server is accepting connections
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;

    TestServer {
        state,
        addr,
        shutdown,
    }
}
