//! Payload Logger Daemon
//!
//! Settings and logging setup for the payload logger binary. Settings
//! come from an optional `payload.toml` in the working directory with
//! `PAYLOAD_*` environment overrides on top; every field has a default
//! taken from the flight configuration.

use acquisition::PipelineConfig;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Ring buffer settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BufferSettings {
    /// Capacity in bytes
    pub capacity_bytes: usize,
}

impl Default for BufferSettings {
    fn default() -> Self {
        Self {
            capacity_bytes: 4096,
        }
    }
}

/// Producer cadence settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SamplingSettings {
    /// Fixed polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
        }
    }
}

/// Storage-side settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory for session log files
    pub data_dir: String,
    /// Rows between durable flushes
    pub flush_every_rows: u64,
    /// Consumer's bounded wait on the wake-up signal, in milliseconds
    pub wait_timeout_ms: u64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            flush_every_rows: 32,
            wait_timeout_ms: 1000,
        }
    }
}

/// Daemon settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub buffer: BufferSettings,
    pub sampling: SamplingSettings,
    pub storage: StorageSettings,
}

impl Settings {
    /// Load settings from `payload.toml` in the working directory
    /// (optional) and `PAYLOAD_*` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name("payload").required(false))
            .add_source(Environment::with_prefix("PAYLOAD").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Map the settings onto the pipeline configuration.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            buffer_capacity: self.buffer.capacity_bytes,
            poll_interval: Duration::from_millis(self.sampling.poll_interval_ms),
            wait_timeout: Duration::from_millis(self.storage.wait_timeout_ms),
            flush_every: self.storage.flush_every_rows,
        }
    }
}

/// Initialize logging
pub fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_ok() {
        info!("Logging initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_flight_configuration() {
        let settings = Settings::default();
        assert_eq!(settings.buffer.capacity_bytes, 4096);
        assert_eq!(settings.sampling.poll_interval_ms, 500);
        assert_eq!(settings.storage.flush_every_rows, 32);
        assert_eq!(settings.storage.wait_timeout_ms, 1000);
    }

    #[test]
    fn test_pipeline_config_mapping() {
        let settings = Settings::default();
        let config = settings.pipeline_config();
        assert_eq!(config.buffer_capacity, 4096);
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.wait_timeout, Duration::from_millis(1000));
        assert_eq!(config.flush_every, 32);
    }
}
