//! Observability metrics for the export pipeline.
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `strand_exporter_records_total` | Counter | - | Records read from the log |
//! | `strand_exporter_batches_total` | Counter | `result` | Batch executions by outcome |
//! | `strand_exporter_batch_ops_total` | Counter | - | Deferred writes executed |
//! | `strand_exporter_batch_duration_seconds` | Histogram | - | Batch execution time |
//! | `strand_exporter_position` | Gauge | - | Last successfully exported position |

use std::time::Duration;

use metrics::{counter, gauge, histogram};

/// Metric names as constants for consistency.
pub mod names {
    /// Counter: Records read from the log.
    pub const RECORDS_TOTAL: &str = "strand_exporter_records_total";
    /// Counter: Batch executions by outcome.
    pub const BATCHES_TOTAL: &str = "strand_exporter_batches_total";
    /// Counter: Deferred writes executed.
    pub const BATCH_OPS_TOTAL: &str = "strand_exporter_batch_ops_total";
    /// Histogram: Batch execution time in seconds.
    pub const BATCH_DURATION_SECONDS: &str = "strand_exporter_batch_duration_seconds";
    /// Gauge: Last successfully exported position.
    pub const POSITION: &str = "strand_exporter_position";
}

/// Label keys used across metrics.
pub mod labels {
    /// Batch outcome (success, failure).
    pub const RESULT: &str = "result";
}

/// High-level interface for recording exporter metrics.
#[derive(Debug, Clone, Default)]
pub struct ExporterMetrics;

impl ExporterMetrics {
    /// Creates a new metrics recorder.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Records records read from the log.
    pub fn record_read(&self, count: usize) {
        counter!(names::RECORDS_TOTAL).increment(count as u64);
    }

    /// Records a batch execution outcome.
    pub fn record_batch(&self, result: &str, ops: usize, duration: Duration) {
        counter!(
            names::BATCHES_TOTAL,
            labels::RESULT => result.to_string(),
        )
        .increment(1);
        counter!(names::BATCH_OPS_TOTAL).increment(ops as u64);
        histogram!(names::BATCH_DURATION_SECONDS).record(duration.as_secs_f64());
    }

    /// Updates the exported-position gauge.
    #[allow(clippy::cast_precision_loss)]
    pub fn set_position(&self, position: u64) {
        gauge!(names::POSITION).set(position as f64);
    }
}
