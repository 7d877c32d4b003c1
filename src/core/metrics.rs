//! Metrics collection using Prometheus
//!
//! Tracks the download pipeline: queue depth, in-flight downloads,
//! task outcomes and transfer duration.

#![allow(clippy::expect_used)]

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge, Histogram, IntCounter,
    IntCounterVec, IntGauge,
};

/// Tasks pushed onto the download queue
pub static TASKS_ENQUEUED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("tgdrop_tasks_enqueued_total", "Total number of queued download tasks")
        .expect("tgdrop_tasks_enqueued_total registers once")
});

/// Finished tasks by outcome
/// Labels: outcome (completed/timeout/failed/unauthorized)
pub static TASK_OUTCOMES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "tgdrop_task_outcomes_total",
        "Total number of finished download tasks by outcome",
        &["outcome"]
    )
    .expect("tgdrop_task_outcomes_total registers once")
});

/// Failed transfers by error class
pub static DOWNLOAD_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "tgdrop_download_failures_total",
        "Total number of failed downloads by error class",
        &["error_type"]
    )
    .expect("tgdrop_download_failures_total registers once")
});

/// Tasks waiting for a worker
pub static QUEUE_DEPTH: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("tgdrop_queue_depth", "Tasks waiting in the download queue")
        .expect("tgdrop_queue_depth registers once")
});

/// Downloads currently running
pub static ACTIVE_DOWNLOADS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("tgdrop_active_downloads", "Downloads currently in progress")
        .expect("tgdrop_active_downloads registers once")
});

/// Transfer plus relocation time of successful downloads
pub static DOWNLOAD_DURATION_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "tgdrop_download_duration_seconds",
        "Time spent downloading and moving a file",
        vec![1.0, 5.0, 10.0, 30.0, 60.0, 300.0, 900.0, 1800.0, 3600.0]
    )
    .expect("tgdrop_download_duration_seconds registers once")
});

/// Files delivered by the bulk re-send directive
pub static OUTBOX_FILES_SENT_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("tgdrop_outbox_files_sent_total", "Files sent from the outbox")
        .expect("tgdrop_outbox_files_sent_total registers once")
});

/// Forces registration so every series shows up on the first scrape
pub fn init_metrics() {
    Lazy::force(&TASKS_ENQUEUED_TOTAL);
    Lazy::force(&TASK_OUTCOMES_TOTAL);
    Lazy::force(&DOWNLOAD_FAILURES_TOTAL);
    Lazy::force(&QUEUE_DEPTH);
    Lazy::force(&ACTIVE_DOWNLOADS);
    Lazy::force(&DOWNLOAD_DURATION_SECONDS);
    Lazy::force(&OUTBOX_FILES_SENT_TOTAL);
    log::info!("Metrics registry initialized");
}

/// Counts a finished task
pub fn record_outcome(outcome: &str) {
    TASK_OUTCOMES_TOTAL.with_label_values(&[outcome]).inc();
}

/// Counts a failed transfer by its error class
pub fn record_failure(error_type: &str) {
    DOWNLOAD_FAILURES_TOTAL.with_label_values(&[error_type]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_outcome_increments() {
        let before = TASK_OUTCOMES_TOTAL.with_label_values(&["completed"]).get();
        record_outcome("completed");
        assert!(TASK_OUTCOMES_TOTAL.with_label_values(&["completed"]).get() > before);
    }

    #[test]
    fn test_init_metrics_gathers_families() {
        init_metrics();
        let mut buffer = Vec::new();
        prometheus::Encoder::encode(&prometheus::TextEncoder::new(), &prometheus::gather(), &mut buffer).unwrap();
        assert!(String::from_utf8(buffer).unwrap().contains("tgdrop_queue_depth"));
    }
}
