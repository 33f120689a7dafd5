use super::types::{
    ChatSection, ParleyConfig, RawChatConfig, RawParleyConfig, RawServerConfig, ServerSection,
};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the project config directory
pub const PROJECT_CONFIG_DIR_ENV: &str = "PARLEY_PROJECT_CONFIG_DIR";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<ParleyConfig> {
        Self::load_layers(
            Self::user_config_path().as_deref(),
            &Self::project_config_path(),
        )
    }

    /// Load from an optional user file and a project file; missing files are skipped
    pub fn load_layers(user_path: Option<&Path>, project_path: &Path) -> Result<ParleyConfig> {
        let mut raw = RawParleyConfig::default();

        // Layer 1: User config
        if let Some(user_path) = user_path
            && user_path.exists()
        {
            raw = Self::merge_raw(raw, Self::read_raw(user_path)?);
        }

        // Layer 2: Project config
        if project_path.exists() {
            raw = Self::merge_raw(raw, Self::read_raw(project_path)?);
        }

        Ok(Self::finalize(raw))
    }

    /// Get user config path (platform-specific)
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "parley").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get project config path
    /// Can be overridden with PARLEY_PROJECT_CONFIG_DIR env var (useful for isolated tests)
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var(PROJECT_CONFIG_DIR_ENV) {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".parley/config.toml")
        }
    }

    fn read_raw(path: &Path) -> Result<RawParleyConfig> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("Invalid config in {}", path.display()))
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawParleyConfig, overlay: RawParleyConfig) -> RawParleyConfig {
        RawParleyConfig {
            server: RawServerConfig {
                host: overlay.server.host.or(base.server.host),
                port: overlay.server.port.or(base.server.port),
                idle_timeout_secs: overlay
                    .server
                    .idle_timeout_secs
                    .or(base.server.idle_timeout_secs),
                sweep_interval_ms: overlay
                    .server
                    .sweep_interval_ms
                    .or(base.server.sweep_interval_ms),
                max_frame_length: overlay
                    .server
                    .max_frame_length
                    .or(base.server.max_frame_length),
                max_protocol_errors: overlay
                    .server
                    .max_protocol_errors
                    .or(base.server.max_protocol_errors),
                outbound_buffer: overlay
                    .server
                    .outbound_buffer
                    .or(base.server.outbound_buffer),
                write_timeout_secs: overlay
                    .server
                    .write_timeout_secs
                    .or(base.server.write_timeout_secs),
            },
            chat: RawChatConfig {
                host: overlay.chat.host.or(base.chat.host),
                port: overlay.chat.port.or(base.chat.port),
                heartbeat_secs: overlay.chat.heartbeat_secs.or(base.chat.heartbeat_secs),
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawParleyConfig) -> ParleyConfig {
        let server = ServerSection::default();
        let chat = ChatSection::default();

        ParleyConfig {
            server: ServerSection {
                host: raw.server.host.unwrap_or(server.host),
                port: raw.server.port.unwrap_or(server.port),
                idle_timeout_secs: raw
                    .server
                    .idle_timeout_secs
                    .unwrap_or(server.idle_timeout_secs),
                sweep_interval_ms: raw
                    .server
                    .sweep_interval_ms
                    .unwrap_or(server.sweep_interval_ms),
                max_frame_length: raw
                    .server
                    .max_frame_length
                    .unwrap_or(server.max_frame_length),
                max_protocol_errors: raw
                    .server
                    .max_protocol_errors
                    .unwrap_or(server.max_protocol_errors),
                outbound_buffer: raw.server.outbound_buffer.unwrap_or(server.outbound_buffer),
                write_timeout_secs: raw
                    .server
                    .write_timeout_secs
                    .unwrap_or(server.write_timeout_secs),
            },
            chat: ChatSection {
                host: raw.chat.host.unwrap_or(chat.host),
                port: raw.chat.port.unwrap_or(chat.port),
                heartbeat_secs: raw.chat.heartbeat_secs.unwrap_or(chat.heartbeat_secs),
            },
        }
    }
}
