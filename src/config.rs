//! Server and participant configuration.

use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Configuration for the game server.
#[derive(Debug, Clone, Getters, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    port: u16,

    /// Directory holding ticket files.
    #[serde(default = "default_data_dir")]
    data_dir: String,

    /// Seconds without a host heartbeat before the host reads as offline.
    #[serde(default = "default_host_ttl_secs")]
    host_ttl_secs: u64,
}

/// Configuration for a participant device.
#[derive(Debug, Clone, Getters, Serialize, Deserialize)]
pub struct ParticipantConfig {
    /// Base URL of the game server.
    #[serde(default = "default_server_url")]
    server_url: String,

    /// Poll cadence in seconds.
    #[serde(default = "default_poll_secs")]
    poll_secs: u64,

    /// Seconds a mid-game host may stay offline before this device resets.
    #[serde(default = "default_host_grace_secs")]
    host_grace_secs: u64,

    /// Durable claim-dedup store; in-memory when unset.
    #[serde(default)]
    claim_store: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_data_dir() -> String {
    "data/tickets".to_string()
}

fn default_host_ttl_secs() -> u64 {
    35
}

fn default_server_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_poll_secs() -> u64 {
    3
}

fn default_host_grace_secs() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
            host_ttl_secs: default_host_ttl_secs(),
        }
    }
}

impl Default for ParticipantConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            poll_secs: default_poll_secs(),
            host_grace_secs: default_host_grace_secs(),
            claim_store: None,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading server config");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        info!(host = %config.host, port = config.port, "Server config loaded");
        Ok(config)
    }

    /// The host-liveness TTL as a duration.
    pub fn host_ttl(&self) -> Duration {
        Duration::from_secs(self.host_ttl_secs)
    }
}

impl ParticipantConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading participant config");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        info!(server_url = %config.server_url, "Participant config loaded");
        Ok(config)
    }

    /// The poll cadence as a duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_secs)
    }

    /// The host grace as a duration.
    pub fn host_grace(&self) -> Duration {
        Duration::from_secs(self.host_grace_secs)
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_to_empty_toml() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config.port(), &5000);
        assert_eq!(config.host_ttl(), Duration::from_secs(35));

        let config: ParticipantConfig = toml::from_str("").unwrap();
        assert_eq!(config.poll_interval(), Duration::from_secs(3));
        assert!(config.claim_store().is_none());
    }

    #[test]
    fn test_partial_override() {
        let config: ParticipantConfig =
            toml::from_str("server_url = \"http://10.0.0.2:5000\"\npoll_secs = 5\n").unwrap();
        assert_eq!(config.server_url().as_str(), "http://10.0.0.2:5000");
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.host_grace(), Duration::from_secs(30));
    }
}
