//! Configuration loading for signal-relay.
//!
//! Configuration is loaded from a TOML file (default: `signal.toml`).

use serde::Deserialize;
use std::path::PathBuf;

/// Root configuration for signal-relay.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Session lifecycle configuration.
    pub session: SessionConfig,
    /// Capability announcement served to clients.
    pub client: ClientConfig,
    /// HTTP endpoints configuration.
    pub http: HttpConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address for the HTTP/WebSocket listener (default: 0.0.0.0:8081).
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

/// Session lifecycle configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Staleness timeout in milliseconds (default: 10000).
    ///
    /// A session untouched for this long is reaped the next time one of its
    /// peers reads a connection list. There is no background timer.
    pub stale_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            stale_timeout_ms: default_stale_timeout_ms(),
        }
    }
}

/// Capability announcement served to clients via `GET /config`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Whether clients should prefer the WebSocket transport (default: true).
    pub use_websocket: bool,
    /// Startup mode announced to clients (default: "public").
    pub startup_mode: String,
    /// Logging mode announced to clients (default: "dev").
    pub logging: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            use_websocket: default_use_websocket(),
            startup_mode: default_startup_mode(),
            logging: default_logging(),
        }
    }
}

/// HTTP endpoints configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Enable the metrics endpoint (default: true).
    pub metrics_enabled: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0:8081".to_string()
}

fn default_stale_timeout_ms() -> u64 {
    10_000
}

fn default_use_websocket() -> bool {
    true
}

fn default_startup_mode() -> String {
    "public".to_string()
}

fn default_logging() -> String {
    "dev".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}
