//! Application Configuration
//!
//! Defaults, overlaid by an optional `spike-cleaner.toml` (or any format the
//! `config` crate recognises), overlaid by `SPIKE__*` environment variables,
//! e.g. `SPIKE__SANITIZER__THRESHOLD=2.5`.

use crate::rate_limit::RateLimitConfig;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use series_sanitizer::{CorrectorConfig, Sanitizer};
use std::time::Duration;
use storage::DEFAULT_STATION_BATCH_SIZE;

use crate::session::DEFAULT_SESSION_IDLE;

/// Base name of the optional configuration file
pub const CONFIG_FILE: &str = "spike-cleaner";
const ENV_PREFIX: &str = "SPIKE";

/// Sanitizer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizerSettings {
    /// Outlier threshold in standard deviations
    pub threshold: f64,
}

impl Default for SanitizerSettings {
    fn default() -> Self {
        Self {
            threshold: CorrectorConfig::default().threshold,
        }
    }
}

impl SanitizerSettings {
    pub fn build(&self) -> Sanitizer {
        Sanitizer::with_threshold(self.threshold)
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Listen address
    pub bind_addr: String,
    /// SQLite connection URL
    pub database_url: String,
    /// Maximum tracing level
    pub log_level: String,
    /// Emit JSON log lines
    pub log_json: bool,
    /// Request body limit for uploads (bytes)
    pub max_upload_bytes: usize,
    /// Rows per INSERT when bulk-loading station names
    pub station_batch_size: usize,
    /// Seconds a session may stay unused before it is forgotten
    pub session_idle_secs: u64,
    pub sanitizer: SanitizerSettings,
    pub rate_limit: RateLimitConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            database_url: "sqlite://spike_data.db".to_string(),
            log_level: "info".to_string(),
            log_json: false,
            max_upload_bytes: 50 * 1024 * 1024,
            station_batch_size: DEFAULT_STATION_BATCH_SIZE,
            session_idle_secs: DEFAULT_SESSION_IDLE.as_secs(),
            sanitizer: SanitizerSettings::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from the default file name and the environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(CONFIG_FILE)
    }

    /// Load from a specific file (extension optional) and the environment
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }

    /// Configuration for tests: in-memory friendly, no rate limiting
    pub fn for_testing() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            rate_limit: RateLimitConfig::disabled(),
            ..Default::default()
        }
    }
}
