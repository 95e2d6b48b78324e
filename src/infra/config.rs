//! Configuration management infrastructure.
//!
//! TOML-backed settings for the batch engine: where the signing tools live,
//! which timestamp authorities to use, and how aggressively to parallelize.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::types::TimestampUrl;
use crate::infra::error::{SignError, SignResult};

/// Default timestamp authorities, tried in order.
pub const DEFAULT_TIMESTAMP_SERVERS: &[&str] = &[
    "http://timestamp.comodoca.com/authenticode",
    "http://timestamp.digicert.com",
    "http://timestamp.sectigo.com",
    "http://tsa.starfieldtech.com",
];

/// Persistent configuration for batch runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfiguration {
    /// Directory holding makecert, cert2spc, pvk2pfx, and signtool.
    pub tools_dir: PathBuf,

    /// Ordered timestamp server URLs; the first is primary, the rest back
    /// the legacy fallback.
    pub timestamp_servers: Vec<String>,

    /// Worker pool size for parallel-class operations.
    pub workers: usize,

    /// Per-invocation timeout in seconds.
    pub task_timeout_seconds: u64,

    /// Whether to log verbose output.
    pub verbose: bool,
}

impl Default for BatchConfiguration {
    fn default() -> Self {
        BatchConfiguration {
            tools_dir: PathBuf::from("tools"),
            timestamp_servers: DEFAULT_TIMESTAMP_SERVERS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            workers: 4,
            task_timeout_seconds: 120,
            verbose: false,
        }
    }
}

impl BatchConfiguration {
    /// Validate the configured server list into typed URLs.
    pub fn timestamp_urls(&self) -> SignResult<Vec<TimestampUrl>> {
        self.timestamp_servers
            .iter()
            .map(TimestampUrl::new)
            .collect()
    }

    #[must_use]
    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_seconds)
    }
}

/// Configuration manager for handling the config file.
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new configuration manager with the default path.
    pub fn new() -> SignResult<Self> {
        let config_path = Self::default_config_path()?;
        Ok(Self { config_path })
    }

    /// Create a configuration manager with a custom path.
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> SignResult<PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            Ok(config_dir.join("signbatch").join("config.toml"))
        } else {
            Err(SignError::ConfigurationError(
                "Could not determine user configuration directory".to_string(),
            ))
        }
    }

    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load the configuration, falling back to defaults when the file does
    /// not exist yet.
    pub fn load_or_default(&self) -> SignResult<BatchConfiguration> {
        if !self.config_path.exists() {
            log::debug!(
                "No config file at {}, using defaults",
                self.config_path.display()
            );
            return Ok(BatchConfiguration::default());
        }
        let content = fs::read_to_string(&self.config_path)?;
        toml::from_str(&content).map_err(|e| {
            SignError::ConfigurationError(format!(
                "Invalid config file {}: {e}",
                self.config_path.display()
            ))
        })
    }

    /// Persist the configuration, creating parent directories as needed.
    pub fn save(&self, config: &BatchConfiguration) -> SignResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(config).map_err(|e| {
            SignError::ConfigurationError(format!("Could not serialize configuration: {e}"))
        })?;
        fs::write(&self.config_path, content)?;
        Ok(())
    }
}
