//! Observability infrastructure for the risk predictor
//!
//! Provides:
//! - Prometheus metrics (prediction latency, prediction/error counts, batch sizes,
//!   text-generation calls, model info)
//! - Structured JSON logging with tracing

use prometheus::{
    register_gauge_vec, register_histogram, register_histogram_vec, register_int_counter_vec,
    register_int_gauge, GaugeVec, Histogram, HistogramVec, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0,
];

/// Histogram buckets for batch sizes (rows per upload)
const BATCH_ROW_BUCKETS: &[f64] = &[1.0, 10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0, 10000.0, 50000.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ServiceMetricsInner> = OnceLock::new();

struct ServiceMetricsInner {
    prediction_latency_seconds: HistogramVec,
    predictions_total: IntCounterVec,
    prediction_errors_total: IntCounterVec,
    batch_rows: Histogram,
    text_generation_requests_total: IntCounterVec,
    model_info: GaugeVec,
    model_loaded: IntGauge,
}

impl ServiceMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram_vec!(
                "risk_service_prediction_latency_seconds",
                "Time spent validating input and running inference",
                &["mode"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_total: register_int_counter_vec!(
                "risk_service_predictions_total",
                "Number of clients scored, by request mode",
                &["mode"]
            )
            .expect("Failed to register predictions_total"),

            prediction_errors_total: register_int_counter_vec!(
                "risk_service_prediction_errors_total",
                "Number of failed prediction requests, by error kind",
                &["kind"]
            )
            .expect("Failed to register prediction_errors_total"),

            batch_rows: register_histogram!(
                "risk_service_batch_rows",
                "Rows per batch prediction upload",
                BATCH_ROW_BUCKETS.to_vec()
            )
            .expect("Failed to register batch_rows"),

            text_generation_requests_total: register_int_counter_vec!(
                "risk_service_text_generation_requests_total",
                "Text-generation calls by feature and outcome",
                &["feature", "outcome"]
            )
            .expect("Failed to register text_generation_requests_total"),

            model_info: register_gauge_vec!(
                "risk_service_model_info",
                "Information about the loaded classifier",
                &["version", "format"]
            )
            .expect("Failed to register model_info"),

            model_loaded: register_int_gauge!(
                "risk_service_model_loaded",
                "1 if a classifier is loaded, 0 if predictions are disabled"
            )
            .expect("Failed to register model_loaded"),
        }
    }
}

/// Service metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct ServiceMetrics {
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ServiceMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ServiceMetrics")
    }
}

impl ServiceMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServiceMetricsInner {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, mode: &str, duration_secs: f64) {
        self.inner()
            .prediction_latency_seconds
            .with_label_values(&[mode])
            .observe(duration_secs);
    }

    /// Count `clients` scored in one request
    pub fn inc_predictions(&self, mode: &str, clients: u64) {
        self.inner()
            .predictions_total
            .with_label_values(&[mode])
            .inc_by(clients);
    }

    pub fn inc_prediction_errors(&self, kind: &str) {
        self.inner()
            .prediction_errors_total
            .with_label_values(&[kind])
            .inc();
    }

    pub fn observe_batch_rows(&self, rows: usize) {
        self.inner().batch_rows.observe(rows as f64);
    }

    pub fn inc_text_generation(&self, feature: &str, outcome: &str) {
        self.inner()
            .text_generation_requests_total
            .with_label_values(&[feature, outcome])
            .inc();
    }

    /// Publish the loaded model, or mark predictions disabled
    pub fn set_model(&self, model: Option<(&str, &str)>) {
        self.inner().model_info.reset();
        match model {
            Some((version, format)) => {
                self.inner()
                    .model_info
                    .with_label_values(&[version, format])
                    .set(1.0);
                self.inner().model_loaded.set(1);
            }
            None => self.inner().model_loaded.set(0),
        }
    }
}

/// Structured logger for service events
///
/// Provides consistent JSON-formatted logging for predictions, model
/// loading and lifecycle events.
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl Default for StructuredLogger {
    fn default() -> Self {
        Self::new("risk-server")
    }
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn log_startup(&self, version: &str, model_version: Option<&str>) {
        info!(
            event = "service_started",
            instance = %self.instance,
            service_version = %version,
            model_version = model_version.unwrap_or("none"),
            "Risk prediction service started"
        );
    }

    pub fn log_model_loaded(&self, version: &str, format: &str, checksum: &str) {
        info!(
            event = "model_loaded",
            instance = %self.instance,
            model_version = %version,
            format = %format,
            checksum = %checksum,
            "Classifier ready"
        );
    }

    pub fn log_model_unavailable(&self, path: &str) {
        warn!(
            event = "model_unavailable",
            instance = %self.instance,
            path = %path,
            "No classifier loaded, prediction endpoints will report the model as unavailable"
        );
    }

    pub fn log_prediction(&self, label: &str, probability: f64, elapsed_us: u128) {
        info!(
            event = "prediction_served",
            instance = %self.instance,
            label = %label,
            probability = probability,
            elapsed_us = elapsed_us as u64,
            "Single-client prediction served"
        );
    }

    pub fn log_batch_prediction(&self, rows: usize, at_risk: usize, elapsed_ms: u128) {
        info!(
            event = "batch_prediction_served",
            instance = %self.instance,
            rows = rows,
            at_risk = at_risk,
            elapsed_ms = elapsed_ms as u64,
            "Batch prediction served"
        );
    }

    pub fn log_prediction_failed(&self, mode: &str, kind: &str, message: &str) {
        warn!(
            event = "prediction_failed",
            instance = %self.instance,
            mode = %mode,
            kind = %kind,
            error = %message,
            "Prediction request failed"
        );
    }

    pub fn log_text_generation(&self, feature: &str, outcome: &str) {
        info!(
            event = "text_generated",
            instance = %self.instance,
            feature = %feature,
            outcome = %outcome,
            "Text-generation request handled"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Risk prediction service shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_metrics_creation() {
        // Prometheus uses a global registry; the OnceLock keeps registration single
        let metrics = ServiceMetrics::new();
        let again = ServiceMetrics::new();

        metrics.observe_prediction_latency("single", 0.001);
        metrics.inc_predictions("batch", 3);
        metrics.inc_prediction_errors("schema_error");
        metrics.observe_batch_rows(3);
        metrics.inc_text_generation("mail", "fallback");
        again.set_model(Some(("v1", "json")));
        again.set_model(None);
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("test-instance");
        assert_eq!(logger.instance(), "test-instance");
        assert_eq!(StructuredLogger::default().instance(), "risk-server");
    }
}
