//! Configuration structures
//!
//! Plain serde models; loading from env/files lives in `oplink-infra`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_API_NAME, DEFAULT_EVENT_CHANNEL_CAPACITY, DEFAULT_LOG_LEVEL, DEFAULT_METRICS_PREFIX,
    DEFAULT_SMOOTHING_FACTOR,
};
use crate::errors::{OplinkError, Result};
use crate::impl_label_conversions;

/// Telemetry configuration for one client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Name attached to every log line and exported record
    pub api_name: String,
    /// EMA smoothing factor for per-operation latency averages, in (0, 1]
    pub smoothing_factor: f64,
    pub logging: LoggingConfig,
    pub sink: SinkConfig,
}

/// Diagnostic logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    pub format: LogFormat,
    /// Include the event target in each line
    pub target: bool,
    /// Directory-qualified file prefix; logs go to stdout when unset
    pub file: Option<PathBuf>,
}

/// Output format for the fmt layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum LogFormat {
    Pretty = 0,
    #[default]
    Compact = 1,
    Json = 2,
}

impl_label_conversions!(LogFormat {
    Pretty => "pretty",
    Compact => "compact",
    Json => "json",
});

/// Event export configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Capacity of the bounded export channel
    pub channel_capacity: usize,
    /// Append exported records to this file as JSON lines
    pub json_lines_path: Option<PathBuf>,
    /// Prefix for metric names
    pub metrics_prefix: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            api_name: DEFAULT_API_NAME.to_string(),
            smoothing_factor: DEFAULT_SMOOTHING_FACTOR,
            logging: LoggingConfig::default(),
            sink: SinkConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            format: LogFormat::default(),
            target: true,
            file: None,
        }
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            json_lines_path: None,
            metrics_prefix: DEFAULT_METRICS_PREFIX.to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Check value ranges that serde cannot express
    ///
    /// # Errors
    /// Returns `OplinkError::Config` when the api name or metrics prefix is
    /// blank, the smoothing factor is outside (0, 1], or the channel capacity
    /// is zero.
    pub fn validate(&self) -> Result<()> {
        if self.api_name.trim().is_empty() {
            return Err(OplinkError::Config("api_name must not be empty".to_string()));
        }
        if !(self.smoothing_factor > 0.0 && self.smoothing_factor <= 1.0) {
            return Err(OplinkError::Config(format!(
                "smoothing_factor must be in (0, 1], got {}",
                self.smoothing_factor
            )));
        }
        if self.sink.channel_capacity == 0 {
            return Err(OplinkError::Config("sink.channel_capacity must be > 0".to_string()));
        }
        if self.sink.metrics_prefix.trim().is_empty() {
            return Err(OplinkError::Config("sink.metrics_prefix must not be empty".to_string()));
        }
        Ok(())
    }
}
