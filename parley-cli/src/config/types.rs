use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawParleyConfig {
    #[serde(default)]
    pub server: RawServerConfig,

    #[serde(default)]
    pub chat: RawChatConfig,
}

/// Server config as stored in TOML (optional fields for proper merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawServerConfig {
    /// Host address to bind to
    pub host: Option<String>,

    /// Port to listen on
    pub port: Option<u16>,

    /// Seconds of silence before a client is evicted
    pub idle_timeout_secs: Option<u64>,

    /// Milliseconds between liveness sweeps
    pub sweep_interval_ms: Option<u64>,

    /// Longest accepted frame in bytes
    pub max_frame_length: Option<usize>,

    /// Consecutive malformed frames before a client is dropped
    pub max_protocol_errors: Option<u32>,

    /// Per-client outbound queue capacity
    pub outbound_buffer: Option<usize>,

    /// Seconds a single write may take
    pub write_timeout_secs: Option<u64>,
}

/// Chat client config as stored in TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawChatConfig {
    /// Relay host to connect to
    pub host: Option<String>,

    /// Relay port to connect to
    pub port: Option<u16>,

    /// Seconds between heartbeats (0 disables them)
    pub heartbeat_secs: Option<u64>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ParleyConfig {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub chat: ChatSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    pub idle_timeout_secs: u64,
    pub sweep_interval_ms: u64,
    pub max_frame_length: usize,
    pub max_protocol_errors: u32,
    pub outbound_buffer: usize,
    pub write_timeout_secs: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        let defaults = parley_server::ServerConfig::default();
        let sweep_interval_ms =
            u64::try_from(defaults.sweep_interval.as_millis()).unwrap_or(u64::MAX);
        Self {
            host: defaults.host,
            port: defaults.port,
            idle_timeout_secs: defaults.idle_timeout.as_secs(),
            sweep_interval_ms,
            max_frame_length: defaults.max_frame_length,
            max_protocol_errors: defaults.max_protocol_errors,
            outbound_buffer: defaults.outbound_buffer,
            write_timeout_secs: defaults.write_timeout.as_secs(),
        }
    }
}

impl ServerSection {
    /// Build the server's runtime configuration
    pub fn to_server_config(&self) -> parley_server::ServerConfig {
        parley_server::ServerConfig::new(self.host.clone(), self.port)
            .with_idle_timeout(Duration::from_secs(self.idle_timeout_secs))
            .with_sweep_interval(Duration::from_millis(self.sweep_interval_ms))
            .with_max_frame_length(self.max_frame_length)
            .with_max_protocol_errors(self.max_protocol_errors)
            .with_outbound_buffer(self.outbound_buffer)
            .with_write_timeout(Duration::from_secs(self.write_timeout_secs))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatSection {
    pub host: String,
    pub port: u16,
    pub heartbeat_secs: u64,
}

impl Default for ChatSection {
    fn default() -> Self {
        Self {
            host: DEFAULT_CHAT_HOST.to_string(),
            port: parley_server::DEFAULT_PORT,
            heartbeat_secs: DEFAULT_HEARTBEAT_SECS,
        }
    }
}

/// Default relay host for the chat client
pub const DEFAULT_CHAT_HOST: &str = "127.0.0.1";

/// Default seconds between chat client heartbeats
pub const DEFAULT_HEARTBEAT_SECS: u64 = 3;
