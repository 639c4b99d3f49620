//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Conversions (started, finished by outcome, durations, active jobs)
//! - Library (imports, deletions)
//! - Document cache writes

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Conversion Metrics
// =============================================================================

/// Conversions started by target format.
pub static CONVERSIONS_STARTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("convertino_conversions_started_total", "Total conversions started"),
        &["format"],
    )
    .unwrap()
});

/// Conversions finished by target format and outcome.
pub static CONVERSIONS_FINISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "convertino_conversions_finished_total",
            "Total conversions finished",
        ),
        &["format", "outcome"], // "completed", "failed", "cancelled", "superseded"
    )
    .unwrap()
});

/// Wall-clock duration of conversions that reached a terminal state.
pub static CONVERSION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "convertino_conversion_duration_seconds",
            "Duration of conversion jobs",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0]),
        &["format", "outcome"],
    )
    .unwrap()
});

/// Conversion jobs currently tracked by the manager.
pub static ACTIVE_JOBS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("convertino_active_jobs", "Conversion jobs currently running").unwrap()
});

// =============================================================================
// Library Metrics
// =============================================================================

/// Documents imported into the library.
pub static DOCUMENTS_IMPORTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "convertino_documents_imported_total",
        "Total documents imported",
    )
    .unwrap()
});

/// Documents deleted from the library.
pub static DOCUMENTS_DELETED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("convertino_documents_deleted_total", "Total documents deleted").unwrap()
});

/// Picked files that could not be imported.
pub static IMPORT_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "convertino_import_failures_total",
        "Total picked files that failed to import",
    )
    .unwrap()
});

// =============================================================================
// Cache Metrics
// =============================================================================

/// Document cache writes by result.
pub static CACHE_SAVES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("convertino_cache_saves_total", "Total document cache writes"),
        &["result"], // "success", "failure", "skipped"
    )
    .unwrap()
});

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Conversions
        Box::new(CONVERSIONS_STARTED.clone()),
        Box::new(CONVERSIONS_FINISHED.clone()),
        Box::new(CONVERSION_DURATION.clone()),
        Box::new(ACTIVE_JOBS.clone()),
        // Library
        Box::new(DOCUMENTS_IMPORTED.clone()),
        Box::new(DOCUMENTS_DELETED.clone()),
        Box::new(IMPORT_FAILURES.clone()),
        // Cache
        Box::new(CACHE_SAVES.clone()),
    ]
}
