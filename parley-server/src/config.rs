//! Server configuration

use std::time::Duration;

use parley_core::DEFAULT_MAX_FRAME_LENGTH;

use crate::error::ServerError;

/// Default host the relay binds to
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Default port the relay listens on
pub const DEFAULT_PORT: u16 = 8888;
/// Sessions silent for longer than this are evicted
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);
/// How often the liveness monitor scans the registry
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);
/// Consecutive malformed frames tolerated before a session is dropped
pub const DEFAULT_MAX_PROTOCOL_ERRORS: u32 = 3;
/// Messages that may queue for one session's writer
pub const DEFAULT_OUTBOUND_BUFFER: usize = 256;
/// Upper bound on a single socket write
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Relay server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Inactivity threshold for eviction
    pub idle_timeout: Duration,
    /// Liveness sweep period
    pub sweep_interval: Duration,
    /// Longest accepted frame in bytes
    pub max_frame_length: usize,
    /// Consecutive malformed frames before disconnecting
    pub max_protocol_errors: u32,
    /// Per-session outbound queue capacity
    pub outbound_buffer: usize,
    /// Per-frame write deadline
    pub write_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
            max_protocol_errors: DEFAULT_MAX_PROTOCOL_ERRORS,
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }
}

impl ServerConfig {
    /// Create a new ServerConfig with the specified host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Returns the socket address string (e.g., "0.0.0.0:8888")
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    #[must_use]
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    #[must_use]
    pub fn with_max_frame_length(mut self, length: usize) -> Self {
        self.max_frame_length = length;
        self
    }

    #[must_use]
    pub fn with_max_protocol_errors(mut self, count: u32) -> Self {
        self.max_protocol_errors = count;
        self
    }

    #[must_use]
    pub fn with_outbound_buffer(mut self, capacity: usize) -> Self {
        self.outbound_buffer = capacity;
        self
    }

    #[must_use]
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Reject values the server cannot run with
    pub fn validate(&self) -> Result<(), ServerError> {
        let invalid = |reason: &str| Err(ServerError::InvalidConfig(reason.to_string()));

        if self.sweep_interval.is_zero() {
            return invalid("sweep_interval must be greater than zero");
        }
        if self.idle_timeout.is_zero() {
            return invalid("idle_timeout must be greater than zero");
        }
        if self.write_timeout.is_zero() {
            return invalid("write_timeout must be greater than zero");
        }
        if self.max_frame_length == 0 {
            return invalid("max_frame_length must be greater than zero");
        }
        if self.outbound_buffer == 0 {
            return invalid("outbound_buffer must be greater than zero");
        }
        if self.max_protocol_errors == 0 {
            return invalid("max_protocol_errors must be greater than zero");
        }
        Ok(())
    }
}
