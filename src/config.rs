//! Configuration types and loading.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Listener configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Room behavior limits.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Snapshot storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults
    /// when the file does not exist. Parse errors are still fatal.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(
                    path = %path.as_ref().display(),
                    "Config file not found, using defaults"
                );
                Ok(Config::default())
            }
            Err(e) => Err(ConfigError::Io(e)),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the HTTP listener (default: 127.0.0.1:8320).
    #[serde(default = "default_bind")]
    pub bind: std::net::SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Room behavior limits.
///
/// Presence timeouts are wall-clock based and evaluated lazily as a
/// side effect of member polls, so the effective staleness bound is
/// the longest gap between any two polls touching the room.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Messages retained per room; oldest entries are dropped beyond
    /// this (default: 100).
    #[serde(default = "default_message_cap")]
    pub message_cap: usize,

    /// Maximum message text length in characters (default: 1000).
    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,

    /// Seconds of poll silence before a member is considered gone
    /// (default: 30).
    #[serde(default = "default_inactive_timeout")]
    pub inactive_timeout_secs: u64,

    /// Seconds between a deleteRoom request and the irrevocable purge
    /// (default: 30). Lets in-flight polls observe 410 Gone.
    #[serde(default = "default_deletion_grace")]
    pub deletion_grace_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            message_cap: default_message_cap(),
            max_message_len: default_max_message_len(),
            inactive_timeout_secs: default_inactive_timeout(),
            deletion_grace_secs: default_deletion_grace(),
        }
    }
}

impl LimitsConfig {
    /// Inactivity threshold in milliseconds.
    pub fn inactive_timeout_ms(&self) -> i64 {
        self.inactive_timeout_secs as i64 * 1000
    }

    /// Deletion grace window in milliseconds.
    pub fn deletion_grace_ms(&self) -> i64 {
        self.deletion_grace_secs as i64 * 1000
    }
}

/// Snapshot storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path of the registry snapshot file (default: rooms.json).
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: std::path::PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
        }
    }
}

fn default_bind() -> std::net::SocketAddr {
    "127.0.0.1:8320".parse().expect("valid default bind address")
}

fn default_message_cap() -> usize {
    100
}

fn default_max_message_len() -> usize {
    1000
}

fn default_inactive_timeout() -> u64 {
    30
}

fn default_deletion_grace() -> u64 {
    30
}

fn default_snapshot_path() -> std::path::PathBuf {
    std::path::PathBuf::from("rooms.json")
}
