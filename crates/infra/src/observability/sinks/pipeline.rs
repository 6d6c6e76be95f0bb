//! Assembles the configured loggers behind one dispatcher

use std::sync::Arc;

use oplink_core::{CompositeLogger, CounterRegistry, EventDispatcher, SimpleLogger};
use oplink_domain::{OplinkError, Result, TelemetryConfig};

use super::channel::{ChannelEventLogger, EventExporter, ExportStats};
use super::json_lines::JsonLinesSink;
use super::metrics_logger::MetricsEventLogger;
use super::tracing_logger::TracingEventLogger;
use crate::errors::to_oplink;

/// Everything a client needs to report operation events
///
/// Fan-out order: counters, tracing, metrics, then the JSON lines export
/// channel when `sink.json_lines_path` is configured.
#[derive(Debug)]
pub struct TelemetryPipeline {
    counters: Arc<CounterRegistry>,
    stats: Arc<SimpleLogger>,
    metrics: Arc<MetricsEventLogger>,
    export: Option<(Arc<ChannelEventLogger>, EventExporter)>,
    dispatcher: Arc<EventDispatcher>,
}

impl TelemetryPipeline {
    /// Build the pipeline for `config`
    ///
    /// # Errors
    /// Returns `OplinkError::Config` if the configuration is invalid, or if a
    /// JSON lines path is configured outside a tokio runtime.
    pub fn from_config(config: &TelemetryConfig) -> Result<Self> {
        config.validate()?;

        let counters = Arc::new(CounterRegistry::new(config.smoothing_factor).map_err(to_oplink)?);
        let stats = Arc::new(SimpleLogger::new(config.api_name.clone(), Arc::clone(&counters)));
        let metrics =
            Arc::new(MetricsEventLogger::new(config.api_name.clone(), &config.sink.metrics_prefix));

        let mut composite = CompositeLogger::new(config.api_name.clone())
            .with_logger(stats.clone())
            .with_logger(Arc::new(TracingEventLogger::new(config.api_name.clone())))
            .with_logger(metrics.clone());

        let export = match &config.sink.json_lines_path {
            Some(path) => {
                if tokio::runtime::Handle::try_current().is_err() {
                    return Err(OplinkError::Config(
                        "JSON lines export requires a running tokio runtime".to_string(),
                    ));
                }
                let sink = Arc::new(JsonLinesSink::new(path.clone()));
                let (logger, exporter) = ChannelEventLogger::with_exporter(
                    config.api_name.clone(),
                    config.sink.channel_capacity,
                    sink,
                );
                let logger = Arc::new(logger);
                composite = composite.with_logger(logger.clone());
                Some((logger, exporter))
            }
            None => None,
        };

        tracing::debug!(api = %config.api_name, loggers = composite.len(), "Telemetry pipeline ready");

        Ok(Self {
            counters,
            stats,
            metrics,
            export,
            dispatcher: Arc::new(EventDispatcher::new(Arc::new(composite))),
        })
    }

    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }

    pub fn counters(&self) -> &Arc<CounterRegistry> {
        &self.counters
    }

    pub fn metrics(&self) -> &MetricsEventLogger {
        &self.metrics
    }

    /// Render the counter report and log it
    pub fn print_stats(&self) -> String {
        self.stats.print_stats()
    }

    /// Records dropped by the export channel, 0 when export is disabled
    pub fn dropped_exports(&self) -> u64 {
        self.export.as_ref().map_or(0, |(logger, _)| logger.dropped_events())
    }

    /// Tear down the pipeline and wait for queued records to be written
    ///
    /// Operations still holding a dispatcher clone keep the export channel
    /// open, so drop them first.
    ///
    /// # Errors
    /// Returns `OplinkError::Internal` if the export task failed.
    pub async fn shutdown(self) -> Result<Option<ExportStats>> {
        let Self { dispatcher, export, .. } = self;
        drop(dispatcher);
        match export {
            Some((logger, exporter)) => {
                drop(logger);
                exporter.join().await.map(Some)
            }
            None => Ok(None),
        }
    }
}
