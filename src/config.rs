//! Configuration system
//!
//! Handles loading configuration from TOML files and environment
//! variables. Environment variables (`GROUNDLINK_*`) override file
//! settings.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub correlation: CorrelationConfig,

    #[serde(default)]
    pub persistence: PersistenceConfig,

    #[serde(default)]
    pub websocket: WebSocketConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Ingest pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    /// Capacity of the decoder handoff channel
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_channel_capacity() -> usize {
    1024
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Correlation configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CorrelationConfig {
    /// Key whose arrival produces a capture event
    #[serde(default = "default_trigger_key")]
    pub trigger_key: u32,

    /// Key snapshotted as the "orientation" dependent
    #[serde(default = "default_orientation_key")]
    pub orientation_key: u32,

    /// Key snapshotted as the "system_time" dependent
    #[serde(default = "default_system_time_key")]
    pub system_time_key: u32,

    /// Key carrying the wall-clock field for the derived capture time
    #[serde(default = "default_clock_key")]
    pub clock_key: u32,

    /// Field on the clock message holding microseconds since epoch
    #[serde(default = "default_clock_field")]
    pub clock_field: String,
}

fn default_trigger_key() -> u32 {
    180 // CAMERA_FEEDBACK
}

fn default_orientation_key() -> u32 {
    265 // MOUNT_ORIENTATION
}

fn default_system_time_key() -> u32 {
    42 // MISSION_CURRENT
}

fn default_clock_key() -> u32 {
    2 // SYSTEM_TIME
}

fn default_clock_field() -> String {
    "timeUnixUsec".to_string()
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            trigger_key: default_trigger_key(),
            orientation_key: default_orientation_key(),
            system_time_key: default_system_time_key(),
            clock_key: default_clock_key(),
            clock_field: default_clock_field(),
        }
    }
}

/// Capture event persistence configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
    /// Path of the capture event file
    #[serde(default = "default_event_file")]
    pub event_file: String,

    /// Capacity of the sink queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_event_file() -> String {
    dirs::data_local_dir()
        .map(|p| {
            p.join("groundlink")
                .join("captures.jsonl")
                .to_string_lossy()
                .to_string()
        })
        .unwrap_or_else(|| "./captures.jsonl".to_string())
}

fn default_queue_capacity() -> usize {
    256
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            event_file: default_event_file(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// WebSocket hub configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketConfig {
    /// Maximum concurrent subscriber connections
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Per-connection outbound buffer (envelopes)
    #[serde(default = "default_send_buffer")]
    pub send_buffer: usize,
}

fn default_max_connections() -> usize {
    256
}

fn default_send_buffer() -> usize {
    64
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            send_buffer: default_send_buffer(),
        }
    }
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("groundlink").join("config.toml")),
            Some(PathBuf::from("/etc/groundlink/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        if let Ok(file) = std::env::var("GROUNDLINK_EVENT_FILE") {
            self.persistence.event_file = file;
        }

        if let Ok(host) = std::env::var("GROUNDLINK_API_HOST") {
            self.api.host = host;
        }
        if let Ok(port) = std::env::var("GROUNDLINK_API_PORT") {
            if let Ok(p) = port.parse() {
                self.api.port = p;
            }
        }

        if let Ok(key) = std::env::var("GROUNDLINK_TRIGGER_KEY") {
            if let Ok(k) = key.parse() {
                self.correlation.trigger_key = k;
            }
        }

        if let Ok(level) = std::env::var("GROUNDLINK_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("GROUNDLINK_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Groundlink Configuration
#
# Environment variables override these settings:
# - GROUNDLINK_EVENT_FILE
# - GROUNDLINK_API_HOST
# - GROUNDLINK_API_PORT
# - GROUNDLINK_TRIGGER_KEY
# - GROUNDLINK_LOG_LEVEL
# - GROUNDLINK_LOG_FORMAT

[ingest]
# Capacity of the decoder handoff channel
channel_capacity = 1024

[correlation]
# Message key whose arrival produces a capture event
trigger_key = 180

# Dependent keys snapshotted at trigger time
orientation_key = 265
system_time_key = 42

# Wall-clock source for the derived capture timestamp
clock_key = 2
clock_field = "timeUnixUsec"

[persistence]
# Capture event file (truncated on startup)
event_file = "~/.local/share/groundlink/captures.jsonl"

# Sink queue capacity; the newest event is dropped when full
queue_capacity = 256

[websocket]
# Maximum concurrent subscriber connections
max_connections = 256

# Per-connection outbound buffer in envelopes
send_buffer = 64

[api]
# API server host
host = "0.0.0.0"

# API server port
port = 3000

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
