//! Domain constants
//!
//! Centralized defaults shared by configuration, logging and metrics.

/// Default EMA smoothing factor for per-operation latency averages.
///
/// Equal weight to the newest sample and the accumulated history.
pub const DEFAULT_SMOOTHING_FACTOR: f64 = 0.5;

/// Default API name attached to loggers and exported records.
pub const DEFAULT_API_NAME: &str = "oplink";

/// Default capacity of the bounded event export channel.
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Default prefix for metric names emitted through the `metrics` facade.
pub const DEFAULT_METRICS_PREFIX: &str = "oplink";

/// Default `tracing` filter directive when `RUST_LOG` is unset.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Label returned for a discriminant that names no known variant.
pub const UNKNOWN_VARIANT_LABEL: &str = "(should not happen)";

/// Header line of the printable counter report.
pub const REPORT_HEADER: &str = "Client Stats";

// Connection context keys
pub const CONTEXT_KEY_IS_SSL: &str = "is_ssl";
pub const CONTEXT_KEY_SSL_SESSION_REUSED: &str = "is_ssl_session_reused";
pub const CONTEXT_KEY_ENDPOINT_VERSION: &str = "endpoint_version";
