//! Prometheus exposition for entry and report monitoring.
//!
//! An embedding service creates a [`TrackerMetrics`] on its registry and
//! feeds it outcomes: entry and clearance counters labeled by process and
//! outcome, plus a histogram of report scan durations labeled by report
//! kind. The library never installs a global registry or exporter; scraping
//! is the embedder's concern.

#[cfg(feature = "metrics")]
use prometheus::{CounterVec, HistogramVec, Opts, Registry};
#[cfg(feature = "metrics")]
use std::time::Duration;

#[cfg(feature = "metrics")]
use crate::error::Result;

/// Entry, clearance, and report-scan metrics for the recording core.
#[cfg(feature = "metrics")]
#[derive(Clone)]
pub struct TrackerMetrics {
    registry: Registry,
    entries_total: CounterVec,
    clears_total: CounterVec,
    report_scan_seconds: HistogramVec,
}

#[cfg(feature = "metrics")]
impl TrackerMetrics {
    /// Register the tracker metrics on `registry`.
    ///
    /// Fails when a metric with the same name is already registered.
    pub fn new(registry: Registry) -> Result<Self> {
        // Counter: process entries by outcome
        let entries_total = CounterVec::new(
            Opts::new(
                "workline_entries_total",
                "Total number of process entry attempts by outcome",
            ),
            &["process", "outcome"],
        )
        .map_err(|e| anyhow::anyhow!("Failed to create entries_total counter: {}", e))?;

        // Counter: process clears by outcome
        let clears_total = CounterVec::new(
            Opts::new(
                "workline_clears_total",
                "Total number of process clearance attempts by outcome",
            ),
            &["process", "outcome"],
        )
        .map_err(|e| anyhow::anyhow!("Failed to create clears_total counter: {}", e))?;

        // Histogram: report scan duration
        let report_scan_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "workline_report_scan_seconds",
                "Report scan duration in seconds",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["report"],
        )
        .map_err(|e| anyhow::anyhow!("Failed to create report_scan_seconds histogram: {}", e))?;

        // Register all metrics
        registry
            .register(Box::new(entries_total.clone()))
            .map_err(|e| anyhow::anyhow!("Failed to register entries_total: {}", e))?;
        registry
            .register(Box::new(clears_total.clone()))
            .map_err(|e| anyhow::anyhow!("Failed to register clears_total: {}", e))?;
        registry
            .register(Box::new(report_scan_seconds.clone()))
            .map_err(|e| anyhow::anyhow!("Failed to register report_scan_seconds: {}", e))?;

        Ok(Self {
            registry,
            entries_total,
            clears_total,
            report_scan_seconds,
        })
    }

    /// The registry these metrics live on, for the embedder's exporter.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record the outcome of one process entry attempt.
    ///
    /// The outcome should be a low-cardinality value like "recorded",
    /// "already_recorded", "cooldown_rejected", or "error".
    pub fn record_entry(&self, process: &str, outcome: &str) {
        self.entries_total
            .with_label_values(&[process, outcome])
            .inc();
    }

    /// Record the outcome of one clearance attempt.
    ///
    /// The outcome should be a low-cardinality value like "cleared",
    /// "not_authorized", "not_found", or "error".
    pub fn record_clear(&self, process: &str, outcome: &str) {
        self.clears_total
            .with_label_values(&[process, outcome])
            .inc();
    }

    /// Record the duration of one report scan.
    ///
    /// The report label should be one of "monthly_records",
    /// "monthly_transactions", or "today_counts".
    pub fn observe_report_scan(&self, report: &str, duration: Duration) {
        self.report_scan_seconds
            .with_label_values(&[report])
            .observe(duration.as_secs_f64());
    }
}
