//! Request and prediction statistics for the fraud detection API.

use crate::types::transaction::CoercionReport;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector shared by all request handlers
pub struct PipelineMetrics {
    /// Prediction requests received
    pub requests: AtomicU64,
    /// Rows scored by the model
    pub rows_scored: AtomicU64,
    /// Requests rejected before feature preparation
    pub client_errors: AtomicU64,
    /// Pipeline failures by error kind
    pipeline_errors: RwLock<BTreeMap<&'static str, u64>>,
    /// Predictions by label
    predictions_by_label: RwLock<BTreeMap<i64, u64>>,
    /// Values coerced to missing, by field
    coerced_fields: RwLock<BTreeMap<&'static str, u64>>,
    /// Request processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            requests: AtomicU64::new(0),
            rows_scored: AtomicU64::new(0),
            client_errors: AtomicU64::new(0),
            pipeline_errors: RwLock::new(BTreeMap::new()),
            predictions_by_label: RwLock::new(BTreeMap::new()),
            coerced_fields: RwLock::new(BTreeMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            start_time: Instant::now(),
        }
    }

    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_client_error(&self) {
        self.client_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pipeline_error(&self, kind: &'static str) {
        *self.pipeline_errors.write().entry(kind).or_insert(0) += 1;
    }

    /// Record a scored batch and how long the request took
    pub fn record_batch(&self, processing_time: Duration, labels: &[i64]) {
        self.rows_scored
            .fetch_add(labels.len() as u64, Ordering::Relaxed);

        {
            let mut by_label = self.predictions_by_label.write();
            for label in labels {
                *by_label.entry(*label).or_insert(0) += 1;
            }
        }

        let mut times = self.processing_times.write();
        times.push(processing_time.as_micros() as u64);
        // Keep only last 10000 for memory efficiency
        if times.len() > 10000 {
            times.drain(0..5000);
        }
    }

    pub fn record_coercions(&self, report: &CoercionReport) {
        if report.is_empty() {
            return;
        }
        let mut coerced = self.coerced_fields.write();
        for (field, count) in report.iter() {
            *coerced.entry(field).or_insert(0) += count as u64;
        }
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let times = self.processing_times.read();
        if times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        drop(times);
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[((count as f64 * 0.95) as usize).min(count - 1)],
            p99_us: sorted[((count as f64 * 0.99) as usize).min(count - 1)],
            max_us: sorted[count - 1],
        }
    }

    /// Rows scored per second since startup
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.rows_scored.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn get_predictions_by_label(&self) -> BTreeMap<i64, u64> {
        self.predictions_by_label.read().clone()
    }

    pub fn get_pipeline_errors(&self) -> BTreeMap<&'static str, u64> {
        self.pipeline_errors.read().clone()
    }

    pub fn get_coerced_fields(&self) -> BTreeMap<&'static str, u64> {
        self.coerced_fields.read().clone()
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let requests = self.requests.load(Ordering::Relaxed);
        let rows = self.rows_scored.load(Ordering::Relaxed);
        let client_errors = self.client_errors.load(Ordering::Relaxed);
        let processing = self.get_processing_stats();
        let by_label = self.get_predictions_by_label();
        let flagged: u64 = by_label
            .iter()
            .filter(|(label, _)| **label != 0)
            .map(|(_, count)| count)
            .sum();
        let flag_rate = if rows > 0 {
            (flagged as f64 / rows as f64) * 100.0
        } else {
            0.0
        };

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║             FRAUD DETECTION API - METRICS SUMMARY            ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Requests: {:>8}  │  Rows Scored: {:>8}  │  {:>6.1} rows/s ║",
            requests,
            rows,
            self.get_throughput()
        );
        info!(
            "║ Flagged:  {:>8}  │  Flag Rate:   {:>7.2}%  │  Rejected: {:>5} ║",
            flagged, flag_rate, client_errors
        );
        info!(
            "║ Request Time (μs): mean={:>6} p50={:>6} p95={:>6} p99={:>6} ║",
            processing.mean_us, processing.p50_us, processing.p95_us, processing.p99_us
        );
        info!("╚══════════════════════════════════════════════════════════════╝");

        for (kind, count) in self.get_pipeline_errors() {
            info!(kind = kind, count = count, "Pipeline failures");
        }
        for (field, count) in self.get_coerced_fields() {
            info!(field = field, count = count, "Values coerced to missing");
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Periodic metrics summary in the log
pub struct MetricsReporter {
    metrics: Arc<PipelineMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<PipelineMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = PipelineMetrics::new();

        metrics.record_request();
        metrics.record_request();
        metrics.record_batch(Duration::from_micros(100), &[0, 1, 0]);
        metrics.record_batch(Duration::from_micros(300), &[1]);
        metrics.record_client_error();
        metrics.record_pipeline_error("missing_fields");

        assert_eq!(metrics.requests.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.rows_scored.load(Ordering::Relaxed), 4);
        assert_eq!(metrics.client_errors.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.get_predictions_by_label().get(&1), Some(&2));
        assert_eq!(metrics.get_pipeline_errors().get("missing_fields"), Some(&1));

        let stats = metrics.get_processing_stats();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.mean_us, 200);
        assert_eq!(stats.max_us, 300);
    }

    #[test]
    fn test_coercions_accumulate() {
        let metrics = PipelineMetrics::new();
        let mut report = CoercionReport::default();
        report.record("amount");
        report.record("amount");
        report.record("step");

        metrics.record_coercions(&report);
        metrics.record_coercions(&report);

        let coerced = metrics.get_coerced_fields();
        assert_eq!(coerced.get("amount"), Some(&4));
        assert_eq!(coerced.get("step"), Some(&2));
    }

    #[test]
    fn test_empty_stats() {
        let metrics = PipelineMetrics::new();
        assert_eq!(metrics.get_processing_stats().count, 0);
        metrics.print_summary();
    }
}
