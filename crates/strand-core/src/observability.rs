//! Observability infrastructure for Strand.
//!
//! Structured logging with consistent spans. This module provides
//! initialization helpers and span constructors for the processing loop and
//! the export pipeline.

use std::sync::Once;
use tracing::Span;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default)]
pub enum LogFormat {
    /// JSON structured logs (for production).
    Json,
    /// Pretty-printed logs (for development).
    #[default]
    Pretty,
}

/// Initializes the logging subsystem.
///
/// Call once at startup. Safe to call multiple times; subsequent calls are
/// no-ops.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Controls log levels (e.g., `info`, `strand_engine=debug`)
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        match format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().json())
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().pretty())
                    .init();
            }
        }
    });
}

/// Creates a span for record-processing operations on one partition.
#[must_use]
pub fn processing_span(operation: &str, partition_id: u16) -> Span {
    tracing::info_span!("processing", op = operation, partition = partition_id)
}

/// Creates a span for export-pipeline operations.
#[must_use]
pub fn export_span(operation: &str, partition_id: u16, position: u64) -> Span {
    tracing::info_span!(
        "export",
        op = operation,
        partition = partition_id,
        position = position,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_logging_is_idempotent() {
        init_logging(LogFormat::Pretty);
        init_logging(LogFormat::Pretty);
    }

    #[test]
    fn span_helpers_create_spans() {
        let span = processing_span("apply", 1);
        let _guard = span.enter();
        tracing::info!("test message in span");
    }
}
