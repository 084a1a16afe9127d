//! Recorder configuration
//!
//! Loaded from TOML or JSON. Every field has a default so partial files are fine.

use super::error::{LoggerError, LoggerResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for the GPS recorder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecorderConfig {
    /// Minimum time between provider updates in milliseconds
    pub min_update_interval_ms: u64,

    /// Minimum displacement between provider updates in meters
    pub min_distance_m: f32,

    /// Sensor name used when naming output files
    pub sensor_name: String,

    /// Output file extension
    pub extension: String,

    /// Whether to also subscribe to the secondary (network) provider
    pub use_secondary_provider: bool,

    /// Capacity of the buffered writer behind each output sink
    pub write_buffer_capacity: usize,

    /// Capacity of the recorder event channel
    pub event_channel_capacity: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            min_update_interval_ms: 100, // 10 Hz max
            min_distance_m: 0.0,
            sensor_name: "gps".to_string(),
            extension: "csv".to_string(),
            use_secondary_provider: true,
            write_buffer_capacity: 8 * 1024,
            event_channel_capacity: 64,
        }
    }
}

impl RecorderConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> LoggerResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| LoggerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration from JSON text
    pub fn from_json_str(text: &str) -> LoggerResult<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| LoggerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file, choosing the format from its extension
    pub fn load(path: &Path) -> LoggerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&text),
            Some("json") => Self::from_json_str(&text),
            other => Err(LoggerError::Config(format!(
                "Unsupported config format: {:?}",
                other
            ))),
        }
    }

    /// Serialize this configuration as pretty TOML
    pub fn to_toml_string(&self) -> LoggerResult<String> {
        toml::to_string_pretty(self).map_err(|e| LoggerError::Config(e.to_string()))
    }

    /// Minimum update interval as a duration
    pub fn min_update_interval(&self) -> Duration {
        Duration::from_millis(self.min_update_interval_ms)
    }

    /// Check that every field holds a usable value
    pub fn validate(&self) -> LoggerResult<()> {
        if self.min_update_interval_ms == 0 {
            return Err(LoggerError::Config(
                "minUpdateIntervalMs must be greater than zero".to_string(),
            ));
        }
        if !(self.min_distance_m >= 0.0) {
            return Err(LoggerError::Config(
                "minDistanceM must not be negative".to_string(),
            ));
        }
        if self.sensor_name.trim().is_empty() {
            return Err(LoggerError::Config("sensorName must not be empty".to_string()));
        }
        if self.extension.trim().is_empty() {
            return Err(LoggerError::Config("extension must not be empty".to_string()));
        }
        if self.write_buffer_capacity == 0 {
            return Err(LoggerError::Config(
                "writeBufferCapacity must be greater than zero".to_string(),
            ));
        }
        if self.event_channel_capacity == 0 {
            return Err(LoggerError::Config(
                "eventChannelCapacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
