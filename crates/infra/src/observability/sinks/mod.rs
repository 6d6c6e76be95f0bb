//! Event logger and sink implementations
//!
//! - [`TracingEventLogger`]: structured `tracing` events on `oplink::events`
//! - [`MetricsEventLogger`]: counters and histograms through `metrics`
//! - [`ChannelEventLogger`] + [`EventExporter`]: non-blocking export to any
//!   [`oplink_core::EventSink`]
//! - [`JsonLinesSink`]: file sink for the exporter
//! - [`TelemetryPipeline`]: all of the above wired from a
//!   [`oplink_domain::TelemetryConfig`]

pub mod channel;
pub mod json_lines;
pub mod metrics_logger;
pub mod pipeline;
pub mod tracing_logger;

pub use channel::{ChannelEventLogger, EventExporter, ExportStats, DEFAULT_EXPORT_BATCH};
pub use json_lines::JsonLinesSink;
pub use metrics_logger::{install_prometheus_recorder, MetricsEventLogger};
pub use pipeline::TelemetryPipeline;
pub use tracing_logger::{TracingEventLogger, EVENT_TARGET};
