//! Configuration loader
//!
//! Loads telemetry configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Reads a `.env` file from the working directory when one exists
//! 2. Attempts to load from environment variables
//! 3. If `OPLINK_API_NAME` is unset, falls back to loading from file
//! 4. If no file is found either, uses [`TelemetryConfig::default`]
//!
//! Every path ends with [`TelemetryConfig::validate`].
//!
//! ## Environment Variables
//! - `OPLINK_API_NAME`: API name attached to loggers (required for this path)
//! - `OPLINK_SMOOTHING_FACTOR`: EMA smoothing factor in (0, 1]
//! - `OPLINK_LOG_LEVEL`: filter directive used when `RUST_LOG` is unset
//! - `OPLINK_LOG_FORMAT`: `pretty`, `compact` or `json`
//! - `OPLINK_LOG_TARGET`: include event targets (true/false)
//! - `OPLINK_LOG_FILE`: write diagnostics to a daily rolling file
//! - `OPLINK_EVENT_CHANNEL_CAPACITY`: bounded export channel size
//! - `OPLINK_EVENT_LOG_PATH`: JSON lines file for exported records
//! - `OPLINK_METRICS_PREFIX`: prefix for emitted metric names
//!
//! ## File Locations
//! The loader probes the following names in each directory (in order):
//! `oplink.toml`, `oplink.json`, `config.toml`, `config.json`.
//! Directories are the working directory, its parent and grandparent,
//! then the same three relative to the executable.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use oplink_domain::{LogFormat, OplinkError, Result, TelemetryConfig};

use crate::errors::to_oplink;

/// File names probed in every candidate directory
const CONFIG_FILE_NAMES: [&str; 4] = ["oplink.toml", "oplink.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `OplinkError::Config` if:
/// - An environment variable or file holds an invalid value
/// - A probed file cannot be parsed
/// - The resulting configuration fails validation
pub fn load() -> Result<TelemetryConfig> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }

    match load_from_env() {
        Ok(config) => {
            tracing::info!(api = %config.api_name, "Configuration loaded from environment variables");
            Ok(config)
        }
        Err(OplinkError::Config(reason)) if std::env::var_os("OPLINK_API_NAME").is_none() => {
            tracing::debug!(%reason, "Environment incomplete, trying file");
            match probe_config_paths() {
                Some(path) => load_from_file(Some(path)),
                None => {
                    tracing::info!("No configuration found, using defaults");
                    let config = TelemetryConfig::default();
                    config.validate()?;
                    Ok(config)
                }
            }
        }
        Err(e) => Err(e),
    }
}

/// Load configuration from environment variables
///
/// `OPLINK_API_NAME` must be present; every other variable falls back to
/// its default.
///
/// # Errors
/// Returns `OplinkError::Config` if the API name is missing or a variable
/// has an invalid value.
pub fn load_from_env() -> Result<TelemetryConfig> {
    let mut config = TelemetryConfig { api_name: env_var("OPLINK_API_NAME")?, ..Default::default() };

    if let Some(factor) = env_parse::<f64>("OPLINK_SMOOTHING_FACTOR", "smoothing factor")? {
        config.smoothing_factor = factor;
    }

    if let Ok(level) = std::env::var("OPLINK_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(format) = std::env::var("OPLINK_LOG_FORMAT") {
        config.logging.format = LogFormat::from_str(&format).map_err(OplinkError::Config)?;
    }
    config.logging.target = env_bool("OPLINK_LOG_TARGET", config.logging.target);
    if let Some(file) = std::env::var_os("OPLINK_LOG_FILE") {
        config.logging.file = Some(PathBuf::from(file));
    }

    if let Some(capacity) = env_parse::<usize>("OPLINK_EVENT_CHANNEL_CAPACITY", "channel capacity")? {
        config.sink.channel_capacity = capacity;
    }
    if let Some(path) = std::env::var_os("OPLINK_EVENT_LOG_PATH") {
        config.sink.json_lines_path = Some(PathBuf::from(path));
    }
    if let Ok(prefix) = std::env::var("OPLINK_METRICS_PREFIX") {
        config.sink.metrics_prefix = prefix;
    }

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `OplinkError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid or validation fails
pub fn load_from_file(path: Option<PathBuf>) -> Result<TelemetryConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(OplinkError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            OplinkError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path).map_err(to_oplink)?;
    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`); a path
/// without an extension is read as JSON. Missing fields take defaults.
///
/// # Errors
/// Returns an error if the format is unsupported or parsing fails.
pub fn parse_config(contents: &str, path: &Path) -> Result<TelemetryConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents).map_err(to_oplink),
        "json" => serde_json::from_str(contents).map_err(to_oplink),
        _ => Err(OplinkError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the standard locations for a configuration file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidates_around(&cwd));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidates_around(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

/// Candidate files in `dir`, its parent and its grandparent
fn candidates_around(dir: &Path) -> Vec<PathBuf> {
    dir.ancestors()
        .take(3)
        .flat_map(|base| CONFIG_FILE_NAMES.iter().map(move |name| base.join(name)))
        .collect()
}

/// Get required environment variable
///
/// # Errors
/// Returns `OplinkError::Config` if the variable is not set.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| OplinkError::Config(format!("Missing required environment variable: {key}")))
}

/// Parse an optional environment variable
///
/// # Errors
/// Returns `OplinkError::Config` if the variable is set but does not parse.
fn env_parse<T>(key: &str, what: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| OplinkError::Config(format!("Invalid {what}: {e}"))),
        Err(_) => Ok(None),
    }
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map_or(default, |s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}
