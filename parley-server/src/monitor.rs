//! Liveness monitor
//!
//! Periodically evicts sessions that have sent nothing for longer than the idle
//! timeout. Eviction is silent: the session's transport is closed and its peers
//! find out on their next delivery attempt.

use std::sync::Arc;
use std::time::Duration;

use parley_core::{SessionId, SessionRegistry};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::ServerConfig;

/// Background sweep over the session registry
pub struct LivenessMonitor {
    registry: Arc<SessionRegistry>,
    sweep_interval: Duration,
    idle_timeout: Duration,
}

impl LivenessMonitor {
    /// Create a monitor with explicit timings
    pub fn new(
        registry: Arc<SessionRegistry>,
        sweep_interval: Duration,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            sweep_interval,
            idle_timeout,
        }
    }

    /// Create a monitor using the timings from `config`
    pub fn from_config(registry: Arc<SessionRegistry>, config: &ServerConfig) -> Self {
        Self::new(registry, config.sweep_interval, config.idle_timeout)
    }

    /// Evict every session idle beyond the timeout
    ///
    /// Returns the IDs of the evicted sessions.
    pub async fn sweep(&self) -> Vec<SessionId> {
        let evicted = self
            .registry
            .evict_idle(Instant::now(), self.idle_timeout)
            .await;

        evicted
            .into_iter()
            .map(|session| {
                info!(
                    session_id = %session.id(),
                    idle_timeout_secs = self.idle_timeout.as_secs(),
                    "Client is offline (inactive beyond idle timeout), disconnecting"
                );
                session.id()
            })
            .collect()
    }

    /// Run the sweep loop until `shutdown` is cancelled
    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let interval_ms = u64::try_from(self.sweep_interval.as_millis()).unwrap_or(u64::MAX);
        debug!(interval_ms, "Liveness monitor started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.sweep().await;
                }
            }
        }

        debug!("Liveness monitor stopped");
    }

    /// Spawn the sweep loop as a background task
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
