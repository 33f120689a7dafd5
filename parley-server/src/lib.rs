//! parley-server - TCP relay server for parley clients
//!
//! This crate owns the listening socket, the [`SessionRegistry`] and the
//! [`LivenessMonitor`]. Every accepted connection becomes a session with its own
//! read loop and writer task; sessions pair up with `/connect` and the server
//! relays their messages.

mod config;
mod connection;
mod dispatcher;
mod error;
mod monitor;
mod router;
mod state;
#[cfg(test)]
mod test_support;

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub use config::{
    DEFAULT_HOST, DEFAULT_IDLE_TIMEOUT, DEFAULT_MAX_PROTOCOL_ERRORS, DEFAULT_OUTBOUND_BUFFER,
    DEFAULT_PORT, DEFAULT_SWEEP_INTERVAL, DEFAULT_WRITE_TIMEOUT, ServerConfig,
};
pub use connection::handle_connection;
pub use dispatcher::CommandDispatcher;
pub use error::ServerError;
pub use monitor::LivenessMonitor;
pub use parley_core::SessionRegistry;
pub use router::{PEER_UNAVAILABLE, Router};
pub use state::AppState;

/// Back-off after a failed accept
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// The parley relay server
pub struct ParleyServer {
    state: Arc<AppState>,
    shutdown: CancellationToken,
}

impl ParleyServer {
    /// Create a new server with fresh state
    pub fn new(config: ServerConfig) -> Self {
        Self::with_state(Arc::new(AppState::new(config)))
    }

    /// Create a server with custom state (for testing)
    pub fn with_state(state: Arc<AppState>) -> Self {
        Self {
            state,
            shutdown: CancellationToken::new(),
        }
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    /// Get the shared application state
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Token that stops the server when cancelled
    ///
    /// Cancelling it closes every open session and the liveness monitor.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run the server, binding to the configured address
    pub async fn run(self) -> Result<(), ServerError> {
        self.config().validate()?;

        let addr = self.config().addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.clone(),
                source: e,
            })?;

        self.run_with_listener(listener).await
    }

    /// Run the server on an already bound listener
    ///
    /// Returns once the shutdown token is cancelled.
    pub async fn run_with_listener(self, listener: TcpListener) -> Result<(), ServerError> {
        self.config().validate()?;

        let local_addr = listener.local_addr()?;
        tracing::info!("parley server listening on {}", local_addr);

        let monitor = LivenessMonitor::from_config(Arc::clone(&self.state.registry), self.config())
            .spawn(self.shutdown.child_token());

        loop {
            let accepted = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, addr)) => {
                    tracing::debug!(%addr, "Accepted connection");
                    tokio::spawn(handle_connection(
                        stream,
                        Arc::clone(&self.state),
                        self.shutdown.clone(),
                    ));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to accept connection");
                    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                }
            }
        }

        if let Err(e) = monitor.await {
            tracing::warn!(error = %e, "Liveness monitor task failed");
        }
        tracing::info!(
            uptime_seconds = self.state.uptime_seconds(),
            "parley server stopped"
        );

        Ok(())
    }
}
