//! Client-wide connection and query counters
//!
//! One registry is shared (via `Arc`) by every logger of a client. Integer
//! counters are lock-free; each per-operation-kind latency average sits
//! behind its own mutex because an EMA update is read-modify-write. There
//! is no registry-wide lock.

use std::fmt;

use oplink_common::observability::{AtomicCounter, MetricsResult, RollingAverage};
use oplink_domain::constants::REPORT_HEADER;
use oplink_domain::OperationType;
use parking_lot::Mutex;
use serde::Serialize;

/// Atomic counters plus one rolling latency average per operation kind
#[derive(Debug)]
pub struct CounterRegistry {
    opened_connections: AtomicCounter,
    closed_connections: AtomicCounter,
    failed_connections: AtomicCounter,
    failed_queries: AtomicCounter,
    succeeded_queries: AtomicCounter,
    reused_ssl_sessions: AtomicCounter,
    latencies: [Mutex<RollingAverage>; OperationType::COUNT],
}

impl CounterRegistry {
    /// Create a registry whose latency averages use `smoothing_factor`
    ///
    /// # Errors
    /// Returns `MetricsError::InvalidSmoothingFactor` unless the factor is in
    /// `(0, 1]`.
    pub fn new(smoothing_factor: f64) -> MetricsResult<Self> {
        let average = RollingAverage::new(smoothing_factor)?;
        Ok(Self {
            opened_connections: AtomicCounter::default(),
            closed_connections: AtomicCounter::default(),
            failed_connections: AtomicCounter::default(),
            failed_queries: AtomicCounter::default(),
            succeeded_queries: AtomicCounter::default(),
            reused_ssl_sessions: AtomicCounter::default(),
            latencies: std::array::from_fn(|_| Mutex::new(average)),
        })
    }

    // ========================================================================
    // Increments
    // ========================================================================

    pub fn increment_opened_connections(&self) {
        self.opened_connections.increment();
    }

    pub fn increment_closed_connections(&self) {
        self.closed_connections.increment();
    }

    pub fn increment_failed_connections(&self) {
        self.failed_connections.increment();
    }

    pub fn increment_failed_queries(&self) {
        self.failed_queries.increment();
    }

    pub fn increment_succeeded_queries(&self) {
        self.succeeded_queries.increment();
    }

    pub fn increment_reused_ssl_sessions(&self) {
        self.reused_ssl_sessions.increment();
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub fn opened_connections(&self) -> u64 {
        self.opened_connections.get()
    }

    pub fn closed_connections(&self) -> u64 {
        self.closed_connections.get()
    }

    pub fn failed_connections(&self) -> u64 {
        self.failed_connections.get()
    }

    pub fn failed_queries(&self) -> u64 {
        self.failed_queries.get()
    }

    pub fn succeeded_queries(&self) -> u64 {
        self.succeeded_queries.get()
    }

    pub fn reused_ssl_sessions(&self) -> u64 {
        self.reused_ssl_sessions.get()
    }

    // ========================================================================
    // Latency
    // ========================================================================

    /// Fold one duration into the average for `kind`
    #[allow(clippy::cast_precision_loss)]
    pub fn record_latency(&self, kind: OperationType, duration_micros: u64) {
        self.latencies[kind.index()].lock().add_sample(duration_micros as f64);
    }

    /// Smoothed latency for `kind` in microseconds, `None` before any sample
    pub fn latency_average(&self, kind: OperationType) -> Option<f64> {
        self.latencies[kind.index()].lock().value()
    }

    /// Point-in-time copy of every counter and seeded average
    ///
    /// Each average's lock is held only while that one value is copied.
    pub fn snapshot(&self) -> CounterSnapshot {
        let latency_averages = OperationType::ALL
            .iter()
            .filter_map(|&kind| {
                let average = *self.latencies[kind.index()].lock();
                average.value().map(|average_micros| LatencyAverage {
                    operation_type: kind,
                    average_micros,
                    samples: average.samples(),
                })
            })
            .collect();

        CounterSnapshot {
            opened_connections: self.opened_connections(),
            closed_connections: self.closed_connections(),
            failed_queries: self.failed_queries(),
            succeeded_queries: self.succeeded_queries(),
            reused_ssl_sessions: self.reused_ssl_sessions(),
            failed_connections: self.failed_connections(),
            latency_averages,
        }
    }

    /// Render the human-readable stats report
    pub fn printable_report(&self) -> String {
        self.snapshot().to_string()
    }
}

/// Smoothed latency of one operation kind
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatencyAverage {
    pub operation_type: OperationType,
    pub average_micros: f64,
    pub samples: u64,
}

/// Copy of the registry taken by [`CounterRegistry::snapshot`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CounterSnapshot {
    pub opened_connections: u64,
    pub closed_connections: u64,
    pub failed_queries: u64,
    pub succeeded_queries: u64,
    pub reused_ssl_sessions: u64,
    pub failed_connections: u64,
    /// Only kinds that have seen at least one sample
    pub latency_averages: Vec<LatencyAverage>,
}

impl fmt::Display for CounterSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{REPORT_HEADER}")?;
        writeln!(f, "Opened Connections {}", self.opened_connections)?;
        writeln!(f, "Closed Connections {}", self.closed_connections)?;
        writeln!(f, "Failed Queries {}", self.failed_queries)?;
        writeln!(f, "Succeeded Queries {}", self.succeeded_queries)?;
        writeln!(f, "Reused SSL Sessions {}", self.reused_ssl_sessions)?;
        writeln!(f, "Failed Connections {}", self.failed_connections)?;
        for latency in &self.latency_averages {
            writeln!(f, "Avg {} Latency (us) {:.1}", latency.operation_type, latency.average_micros)?;
        }
        Ok(())
    }
}
