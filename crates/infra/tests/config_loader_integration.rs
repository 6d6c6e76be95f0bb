//! Integration tests for configuration loader
//!
//! Tests the end-to-end behavior of loading configuration from files and
//! feeding it into the telemetry pipeline.

use std::io::Write;
use std::path::PathBuf;

use oplink_domain::{LogFormat, OplinkError, TelemetryConfig};
use oplink_infra::config;
use tempfile::Builder;

fn config_file(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
    let mut file = Builder::new().prefix("oplink").suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

/// Validates a complete TOML file.
///
/// Assertions:
/// - Every section is read, including nested logging and sink tables.
#[test]
fn test_load_config_from_toml_file() {
    let file = config_file(
        ".toml",
        r#"
api_name = "checkout"
smoothing_factor = 0.2

[logging]
level = "oplink=debug,info"
format = "json"
target = true
file = "/var/log/oplink/checkout.log"

[sink]
channel_capacity = 512
json_lines_path = "/var/log/oplink/events.jsonl"
metrics_prefix = "checkout_db"
"#,
    );

    let config = config::load_from_file(Some(file.path().to_path_buf())).unwrap();

    assert_eq!(config.api_name, "checkout");
    assert!((config.smoothing_factor - 0.2).abs() < f64::EPSILON);
    assert_eq!(config.logging.level, "oplink=debug,info");
    assert_eq!(config.logging.format, LogFormat::Json);
    assert!(config.logging.target);
    assert_eq!(config.logging.file, Some(PathBuf::from("/var/log/oplink/checkout.log")));
    assert_eq!(config.sink.channel_capacity, 512);
    assert_eq!(config.sink.metrics_prefix, "checkout_db");
}

/// Validates that an empty JSON object yields the documented defaults.
///
/// Assertions:
/// - The loaded config equals `TelemetryConfig::default()`.
/// - The default smoothing factor is 0.5.
#[test]
fn test_empty_json_file_uses_defaults() -> anyhow::Result<()> {
    let file = config_file(".json", "{}");
    let config = config::load_from_file(Some(file.path().to_path_buf()))?;

    assert_eq!(config, TelemetryConfig::default());
    assert!((config.smoothing_factor - 0.5).abs() < f64::EPSILON);
    Ok(())
}

/// Validates rejection of out-of-range values after parsing.
///
/// Assertions:
/// - A blank API name and a zero channel capacity are config errors.
#[test]
fn test_invalid_values_are_config_errors() {
    for contents in ["api_name = \"  \"\n", "[sink]\nchannel_capacity = 0\n"] {
        let file = config_file(".toml", contents);
        let result = config::load_from_file(Some(file.path().to_path_buf()));
        assert!(matches!(result, Err(OplinkError::Config(_))), "accepted: {contents}");
    }
}

#[test]
fn test_wrong_field_type_is_reported() {
    let file = config_file(".json", r#"{ "smoothing_factor": "half" }"#);
    assert!(config::load_from_file(Some(file.path().to_path_buf())).is_err());
}
