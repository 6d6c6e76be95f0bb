//! Serialization helpers for domain types

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer};

/// Serialize a [`Duration`] as whole microseconds
///
/// Operation durations are measured in microseconds everywhere in the
/// logging pipeline, so records keep that unit on the wire.
///
/// # Usage
/// ```rust
/// use std::time::Duration;
///
/// use oplink_domain::utils::serde::duration_micros;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Example {
///     #[serde(with = "duration_micros")]
///     elapsed: Duration,
/// }
/// ```
pub mod duration_micros {
    use super::*;

    type SerializeResult<S> = Result<<S as Serializer>::Ok, <S as Serializer>::Error>;

    /// Serialize a Duration as microseconds (u64, saturating)
    pub fn serialize<S>(duration: &Duration, serializer: S) -> SerializeResult<S>
    where
        S: Serializer,
    {
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
        serializer.serialize_u64(micros)
    }

    /// Deserialize microseconds (u64) into a Duration
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let micros = u64::deserialize(deserializer)?;
        Ok(Duration::from_micros(micros))
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Timed {
        #[serde(with = "duration_micros")]
        elapsed: Duration,
    }

    #[test]
    fn test_serializes_as_micros() {
        let value = Timed { elapsed: Duration::from_millis(5) };
        assert_eq!(serde_json::to_string(&value).unwrap(), r#"{"elapsed":5000}"#);
    }

    #[test]
    fn test_sub_microsecond_precision_is_truncated() {
        let value = Timed { elapsed: Duration::from_nanos(1_999) };
        let json = serde_json::to_string(&value).unwrap();
        let back: Timed = serde_json::from_str(&json).unwrap();
        assert_eq!(back.elapsed, Duration::from_micros(1));
    }
}
