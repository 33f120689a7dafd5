//! Shared state for the parley server

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parley_core::SessionRegistry;

use crate::config::ServerConfig;
use crate::router::Router;

/// Shared state accessible by every connection task and the liveness monitor
#[derive(Clone)]
pub struct AppState {
    /// Server configuration
    pub config: ServerConfig,
    /// Registry of connected sessions
    pub registry: Arc<SessionRegistry>,
    /// Directed delivery between sessions
    pub router: Router,
    /// When the server started
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create a new AppState with an empty registry
    pub fn new(config: ServerConfig) -> Self {
        Self::with_registry(config, Arc::new(SessionRegistry::new()))
    }

    /// Create AppState around an existing registry (for testing)
    pub fn with_registry(config: ServerConfig, registry: Arc<SessionRegistry>) -> Self {
        let router = Router::new(Arc::clone(&registry));
        Self {
            config,
            registry,
            router,
            started_at: Utc::now(),
        }
    }

    /// Returns how long the server has been running
    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}
