//! Configuration loading for changeq clients.
//!
//! Configuration is loaded from a TOML file (default: `changeq.toml`).
//! Every section and field is optional.

use changeq_sync_core::SyncOptions;
use changeq_sync_types::{DEFAULT_IDS_KEY, DEFAULT_TOTAL_KEY};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    /// HTTP transport configuration.
    #[serde(default)]
    pub transport: TransportConfig,
    /// Change queue configuration.
    #[serde(default)]
    pub queue: QueueConfig,
    /// Page fetch configuration.
    #[serde(default)]
    pub page: PageConfig,
}

/// HTTP transport configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TransportConfig {
    /// Base URL that relative resource URLs are resolved against.
    pub base_url: Option<String>,
    /// Request timeout in seconds (default: 30).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Change queue configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QueueConfig {
    /// Flush after every recorded mutation (default: true).
    #[serde(default = "default_auto_sync")]
    pub auto_sync: bool,
    /// Minimum latency of each flush, in milliseconds (default: none).
    pub delay_ms: Option<u64>,
    /// Nest flush bodies under this key (default: none).
    pub wrap_key: Option<String>,
}

/// Page fetch configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PageConfig {
    /// Key of the identifier array in page responses (default: `itemIds`).
    #[serde(default = "default_ids_key")]
    pub ids_key: String,
    /// Key of the server-reported total (default: `totalItemCount`).
    #[serde(default = "default_total_key")]
    pub total_key: String,
    /// Items requested per page (default: 50).
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

// Default value functions
fn default_timeout_secs() -> u64 {
    30
}

fn default_auto_sync() -> bool {
    true
}

fn default_ids_key() -> String {
    DEFAULT_IDS_KEY.to_string()
}

fn default_total_key() -> String {
    DEFAULT_TOTAL_KEY.to_string()
}

fn default_page_size() -> usize {
    50
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            auto_sync: default_auto_sync(),
            delay_ms: None,
            wrap_key: None,
        }
    }
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            ids_key: default_ids_key(),
            total_key: default_total_key(),
            page_size: default_page_size(),
        }
    }
}

impl QueueConfig {
    /// Set whether mutations trigger a flush.
    pub fn with_auto_sync(mut self, auto_sync: bool) -> Self {
        self.auto_sync = auto_sync;
        self
    }

    /// Set the minimum flush latency.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay_ms = Some(delay.as_millis() as u64);
        self
    }

    /// Set the key flush bodies are nested under.
    pub fn with_wrap_key(mut self, key: impl Into<String>) -> Self {
        self.wrap_key = Some(key.into());
        self
    }

    /// Transaction options shared by every flush.
    pub fn sync_options(&self) -> SyncOptions {
        let mut options = SyncOptions::new();
        if let Some(ms) = self.delay_ms {
            options = options.with_delay_ms(ms);
        }
        if let Some(key) = &self.wrap_key {
            options = options.with_wrap_key(key.clone());
        }
        options
    }
}

impl PageConfig {
    /// Set the identifier array key.
    pub fn with_ids_key(mut self, key: impl Into<String>) -> Self {
        self.ids_key = key.into();
        self
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
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
