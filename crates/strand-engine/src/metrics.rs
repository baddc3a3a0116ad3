//! Observability metrics for the state engine.
//!
//! Metrics are exposed via the `metrics` crate facade; install a recorder
//! (e.g. a Prometheus exporter) in the host process to scrape them.
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `strand_engine_records_total` | Counter | `kind`, `value_type` | Records appended to the log |
//! | `strand_engine_rejections_total` | Counter | `reason_kind` | Commands rejected |
//! | `strand_engine_applied_events_total` | Counter | `value_type` | Events applied to state |
//! | `strand_engine_replayed_records_total` | Counter | - | Records seen during replay |
//! | `strand_engine_command_duration_seconds` | Histogram | `value_type` | End-to-end command processing time |

use std::time::Duration;

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    /// Counter: Records appended to the log.
    pub const RECORDS_TOTAL: &str = "strand_engine_records_total";
    /// Counter: Commands rejected.
    pub const REJECTIONS_TOTAL: &str = "strand_engine_rejections_total";
    /// Counter: Events applied to partition state.
    pub const APPLIED_EVENTS_TOTAL: &str = "strand_engine_applied_events_total";
    /// Counter: Records seen during replay.
    pub const REPLAYED_RECORDS_TOTAL: &str = "strand_engine_replayed_records_total";
    /// Histogram: End-to-end command processing time in seconds.
    pub const COMMAND_DURATION_SECONDS: &str = "strand_engine_command_duration_seconds";
}

/// Label keys used across metrics.
pub mod labels {
    /// Record kind (command, event, rejection).
    pub const KIND: &str = "kind";
    /// Record value type.
    pub const VALUE_TYPE: &str = "value_type";
    /// Rejection classification (not_found, invalid_state, invalid_argument).
    pub const REASON_KIND: &str = "reason_kind";
}

/// High-level interface for recording engine metrics.
#[derive(Debug, Clone, Default)]
pub struct EngineMetrics;

impl EngineMetrics {
    /// Creates a new metrics recorder.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Records an appended record.
    pub fn record_appended(&self, kind: &str, value_type: &str) {
        counter!(
            names::RECORDS_TOTAL,
            labels::KIND => kind.to_string(),
            labels::VALUE_TYPE => value_type.to_string(),
        )
        .increment(1);
    }

    /// Records a command rejection.
    pub fn record_rejection(&self, reason_kind: &str) {
        counter!(
            names::REJECTIONS_TOTAL,
            labels::REASON_KIND => reason_kind.to_string(),
        )
        .increment(1);
    }

    /// Records an event applied to partition state.
    pub fn record_applied(&self, value_type: &str) {
        counter!(
            names::APPLIED_EVENTS_TOTAL,
            labels::VALUE_TYPE => value_type.to_string(),
        )
        .increment(1);
    }

    /// Records one replayed record.
    pub fn record_replayed(&self) {
        counter!(names::REPLAYED_RECORDS_TOTAL).increment(1);
    }

    /// Records end-to-end command processing time.
    pub fn observe_command_duration(&self, value_type: &str, duration: Duration) {
        histogram!(
            names::COMMAND_DURATION_SECONDS,
            labels::VALUE_TYPE => value_type.to_string(),
        )
        .record(duration.as_secs_f64());
    }
}
