//! Conversions from external infrastructure errors into domain errors.

use std::io::{Error as IoError, ErrorKind};

use oplink_common::observability::MetricsError;
use oplink_domain::OplinkError;
use serde_json::Error as JsonError;
use thiserror::Error;
use toml::de::Error as TomlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct InfraError(#[from] pub OplinkError);

impl From<InfraError> for OplinkError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoOplinkError {
    fn into_oplink(self) -> OplinkError;
}

/* -------------------------------------------------------------------------- */
/* std::io::Error → OplinkError */
/* -------------------------------------------------------------------------- */

impl IntoOplinkError for IoError {
    fn into_oplink(self) -> OplinkError {
        match self.kind() {
            ErrorKind::NotFound => OplinkError::Io(format!("file not found: {self}")),
            ErrorKind::PermissionDenied => OplinkError::Io(format!("permission denied: {self}")),
            ErrorKind::InvalidData | ErrorKind::InvalidInput => {
                OplinkError::InvalidInput(self.to_string())
            }
            _ => OplinkError::Io(self.to_string()),
        }
    }
}

impl From<IoError> for InfraError {
    fn from(value: IoError) -> Self {
        InfraError(value.into_oplink())
    }
}

/* -------------------------------------------------------------------------- */
/* toml::de::Error → OplinkError */
/* -------------------------------------------------------------------------- */

impl IntoOplinkError for TomlError {
    fn into_oplink(self) -> OplinkError {
        OplinkError::Config(format!("Invalid TOML format: {}", self.message()))
    }
}

impl From<TomlError> for InfraError {
    fn from(value: TomlError) -> Self {
        InfraError(value.into_oplink())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → OplinkError */
/* -------------------------------------------------------------------------- */

impl IntoOplinkError for JsonError {
    fn into_oplink(self) -> OplinkError {
        use serde_json::error::Category;

        match self.classify() {
            Category::Io => OplinkError::Io(format!("JSON I/O failure: {self}")),
            Category::Syntax | Category::Eof => {
                OplinkError::Config(format!("Invalid JSON format: {self}"))
            }
            Category::Data => OplinkError::Serialization(format!("JSON shape mismatch: {self}")),
        }
    }
}

impl From<JsonError> for InfraError {
    fn from(value: JsonError) -> Self {
        InfraError(value.into_oplink())
    }
}

/* -------------------------------------------------------------------------- */
/* MetricsError → OplinkError */
/* -------------------------------------------------------------------------- */

impl IntoOplinkError for MetricsError {
    fn into_oplink(self) -> OplinkError {
        match self {
            MetricsError::InvalidSmoothingFactor { .. } => OplinkError::Config(self.to_string()),
            other => OplinkError::Internal(other.to_string()),
        }
    }
}

impl From<MetricsError> for InfraError {
    fn from(value: MetricsError) -> Self {
        InfraError(value.into_oplink())
    }
}

/// Convert any supported infrastructure error straight into the domain error
pub fn to_oplink<E>(error: E) -> OplinkError
where
    InfraError: From<E>,
{
    InfraError::from(error).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infra_error_is_transparent_over_domain_error() {
        let err = InfraError::from(OplinkError::Config("bad smoothing factor".to_string()));
        assert_eq!(err.to_string(), "Configuration error: bad smoothing factor");
        assert!(std::error::Error::source(&err).is_none());
        assert!(matches!(OplinkError::from(err), OplinkError::Config(_)));
    }

    #[test]
    fn io_not_found_maps_to_io_error() {
        let err = IoError::new(ErrorKind::NotFound, "oplink.toml");
        match to_oplink(err) {
            OplinkError::Io(msg) => assert!(msg.contains("not found")),
            other => panic!("expected io error, got {other:?}"),
        }
    }

    #[test]
    fn io_invalid_data_maps_to_invalid_input() {
        let err = IoError::new(ErrorKind::InvalidData, "stream did not contain valid UTF-8");
        assert!(matches!(to_oplink(err), OplinkError::InvalidInput(_)));
    }

    #[test]
    fn toml_syntax_maps_to_config_error() {
        let err = toml::from_str::<toml::Table>("api_name = ").unwrap_err();
        match to_oplink(err) {
            OplinkError::Config(msg) => assert!(msg.contains("TOML")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn json_syntax_and_data_errors_are_distinguished() {
        let syntax = serde_json::from_str::<serde_json::Value>("{ \"a\": ").unwrap_err();
        assert!(matches!(to_oplink(syntax), OplinkError::Config(_)));

        let data = serde_json::from_str::<u32>("\"not a number\"").unwrap_err();
        assert!(matches!(to_oplink(data), OplinkError::Serialization(_)));
    }

    #[test]
    fn invalid_smoothing_factor_maps_to_config_error() {
        let err = MetricsError::InvalidSmoothingFactor { factor: 1.5 };
        match to_oplink(err) {
            OplinkError::Config(msg) => assert!(msg.contains("1.5")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn round_trip_through_newtype_preserves_variant() {
        let original = OplinkError::Internal("boom".into());
        let wrapped = InfraError::from(original);
        assert!(matches!(OplinkError::from(wrapped), OplinkError::Internal(_)));
    }
}
