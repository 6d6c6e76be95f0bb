//! Non-blocking hand-off of events to an asynchronous sink
//!
//! [`ChannelEventLogger`] turns each event into an owned [`EventRecord`] and
//! pushes it into a bounded tokio channel with `try_send`, so the caller
//! never waits. When the channel is full or the exporter is gone the record
//! is dropped and counted. [`EventExporter`] drains the channel in batches
//! into any [`EventSink`].

use std::sync::Arc;

use oplink_common::observability::AtomicCounter;
use oplink_core::{EventLogger, EventSink};
use oplink_domain::{
    CommonLoggingData, ConnectionInfo, EventRecord, FailureDetails, FailureReason, OplinkError,
    QueryLoggingData, Result,
};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Largest batch handed to a sink in one `export` call
pub const DEFAULT_EXPORT_BATCH: usize = 256;

/// Logger that queues records for [`EventExporter`]
#[derive(Debug)]
pub struct ChannelEventLogger {
    api_name: String,
    sender: mpsc::Sender<EventRecord>,
    dropped: AtomicCounter,
}

impl ChannelEventLogger {
    /// Create the logger and the receiving half of its channel
    ///
    /// A capacity of zero is raised to one.
    pub fn new(api_name: impl Into<String>, capacity: usize) -> (Self, mpsc::Receiver<EventRecord>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { api_name: api_name.into(), sender, dropped: AtomicCounter::default() }, receiver)
    }

    /// Create the logger with an exporter already draining it into `sink`
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_exporter(
        api_name: impl Into<String>,
        capacity: usize,
        sink: Arc<dyn EventSink>,
    ) -> (Self, EventExporter) {
        let (logger, receiver) = Self::new(api_name, capacity);
        (logger, EventExporter::spawn(receiver, sink, DEFAULT_EXPORT_BATCH))
    }

    /// Records lost to a full or closed channel
    pub fn dropped_events(&self) -> u64 {
        self.dropped.get()
    }

    fn enqueue(&self, record: EventRecord) {
        let kind = record.kind;
        match self.sender.try_send(record) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped.increment();
                if dropped == 1 {
                    warn!(api = %self.api_name, event = kind.as_str(), "Event channel full; dropping records");
                } else {
                    debug!(api = %self.api_name, event = kind.as_str(), dropped, "Event channel full");
                }
            }
            Err(TrySendError::Closed(_)) => {
                let dropped = self.dropped.increment();
                debug!(api = %self.api_name, event = kind.as_str(), dropped, "Event exporter gone");
            }
        }
    }
}

impl EventLogger for ChannelEventLogger {
    fn log_query_success(&self, data: &QueryLoggingData, conn: &ConnectionInfo<'_>) {
        self.enqueue(EventRecord::query_success(&self.api_name, data, conn));
    }

    fn log_query_failure(
        &self,
        data: &QueryLoggingData,
        reason: FailureReason,
        code: u32,
        message: &str,
        conn: &ConnectionInfo<'_>,
    ) {
        let failure = FailureDetails { reason, code, message: message.to_string() };
        self.enqueue(EventRecord::query_failure(&self.api_name, data, failure, conn));
    }

    fn log_connection_success(&self, data: &CommonLoggingData, conn: &ConnectionInfo<'_>) {
        self.enqueue(EventRecord::connection_success(&self.api_name, data, conn));
    }

    fn log_connection_failure(
        &self,
        data: &CommonLoggingData,
        reason: FailureReason,
        code: u32,
        message: &str,
        conn: &ConnectionInfo<'_>,
    ) {
        let failure = FailureDetails { reason, code, message: message.to_string() };
        self.enqueue(EventRecord::connection_failure(&self.api_name, data, failure, conn));
    }

    fn log_connection_closed(&self, conn: &ConnectionInfo<'_>) {
        self.enqueue(EventRecord::connection_closed(&self.api_name, conn));
    }

    fn api_name(&self) -> &str {
        &self.api_name
    }
}

/// Totals reported when an exporter finishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportStats {
    /// Records the sink accepted
    pub exported: u64,
    /// Records in batches the sink rejected
    pub failed: u64,
    /// Number of `export` calls
    pub batches: u64,
}

/// Background task draining a channel into an [`EventSink`]
///
/// Runs until every sender is dropped and the channel is empty, then flushes
/// the sink once.
#[derive(Debug)]
pub struct EventExporter {
    handle: JoinHandle<ExportStats>,
}

impl EventExporter {
    /// Spawn the export loop on the current tokio runtime
    pub fn spawn(
        receiver: mpsc::Receiver<EventRecord>,
        sink: Arc<dyn EventSink>,
        max_batch: usize,
    ) -> Self {
        Self { handle: tokio::spawn(run_export(receiver, sink, max_batch.max(1))) }
    }

    /// Wait for the loop to finish
    ///
    /// # Errors
    /// Returns `OplinkError::Internal` if the export task panicked or was
    /// aborted.
    pub async fn join(self) -> Result<ExportStats> {
        self.handle
            .await
            .map_err(|e| OplinkError::Internal(format!("Event exporter task failed: {e}")))
    }

    /// Stop exporting without draining
    pub fn abort(&self) {
        self.handle.abort();
    }
}

async fn run_export(
    mut receiver: mpsc::Receiver<EventRecord>,
    sink: Arc<dyn EventSink>,
    max_batch: usize,
) -> ExportStats {
    let mut stats = ExportStats::default();
    let mut batch = Vec::with_capacity(max_batch);

    while let Some(first) = receiver.recv().await {
        batch.push(first);
        while batch.len() < max_batch {
            match receiver.try_recv() {
                Ok(record) => batch.push(record),
                Err(_) => break,
            }
        }

        let size = batch.len() as u64;
        stats.batches += 1;
        match sink.export(&batch).await {
            Ok(()) => stats.exported += size,
            Err(error) => {
                stats.failed += size;
                warn!(sink = sink.name(), records = size, %error, "Event export failed");
            }
        }
        batch.clear();
    }

    if let Err(error) = sink.flush().await {
        warn!(sink = sink.name(), %error, "Event sink flush failed");
    }
    debug!(sink = sink.name(), exported = stats.exported, failed = stats.failed, "Event exporter finished");
    stats
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use oplink_domain::{EventKind, OperationType};

    use super::*;

    #[derive(Default)]
    struct MemorySink {
        records: Mutex<Vec<EventRecord>>,
        flushed: AtomicCounter,
        fail: bool,
    }

    #[async_trait]
    impl EventSink for MemorySink {
        async fn export(&self, records: &[EventRecord]) -> Result<()> {
            if self.fail {
                return Err(OplinkError::Io("disk full".into()));
            }
            self.records.lock().unwrap().extend_from_slice(records);
            Ok(())
        }

        async fn flush(&self) -> Result<()> {
            self.flushed.increment();
            Ok(())
        }

        fn name(&self) -> &str {
            "memory"
        }
    }

    fn query() -> QueryLoggingData {
        QueryLoggingData::new(OperationType::Query, Duration::from_micros(40), "SELECT 1")
    }

    #[test]
    fn test_full_channel_drops_and_counts() {
        let (logger, _receiver) = ChannelEventLogger::new("api", 2);
        for _ in 0..5 {
            logger.log_query_success(&query(), &ConnectionInfo::empty());
        }
        assert_eq!(logger.dropped_events(), 3);
    }

    #[test]
    fn test_closed_channel_drops_and_counts() {
        let (logger, receiver) = ChannelEventLogger::new("api", 8);
        drop(receiver);
        logger.log_connection_closed(&ConnectionInfo::empty());
        assert_eq!(logger.dropped_events(), 1);
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let (logger, mut receiver) = ChannelEventLogger::new("api", 0);
        logger.log_query_failure(&query(), FailureReason::Timeout, 0, "late", &ConnectionInfo::empty());
        let record = receiver.try_recv().unwrap();
        assert_eq!(record.kind, EventKind::QueryFailure);
        assert_eq!(record.failure.unwrap().reason, FailureReason::Timeout);
    }

    #[tokio::test]
    async fn test_exporter_drains_everything_then_flushes() {
        let sink = Arc::new(MemorySink::default());
        let (logger, exporter) = ChannelEventLogger::with_exporter("orders", 64, sink.clone());

        for _ in 0..10 {
            logger.log_query_success(&query(), &ConnectionInfo::empty());
        }
        drop(logger);

        let stats = exporter.join().await.unwrap();
        assert_eq!(stats.exported, 10);
        assert_eq!(stats.failed, 0);
        assert!(stats.batches >= 1);
        assert_eq!(sink.records.lock().unwrap().len(), 10);
        assert_eq!(sink.flushed.get(), 1);
    }

    #[tokio::test]
    async fn test_sink_errors_are_counted_not_fatal() {
        let sink = Arc::new(MemorySink { fail: true, ..MemorySink::default() });
        let (logger, receiver) = ChannelEventLogger::new("orders", 16);
        let exporter = EventExporter::spawn(receiver, sink, 2);

        for _ in 0..5 {
            logger.log_connection_closed(&ConnectionInfo::empty());
        }
        drop(logger);

        let stats = exporter.join().await.unwrap();
        assert_eq!(stats.failed, 5);
        assert_eq!(stats.exported, 0);
        assert!(stats.batches >= 3);
    }
}
