//! Prometheus metrics for the HTTP surface.
//!
//! Every store operation is timed with a [`RequestMetrics`] guard; rejected
//! requests are additionally counted by [`ErrorCode`].

use crate::error::ErrorCode;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use prometheus_client::encoding::{EncodeLabelSet, text::encode};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Global metrics registry instance
pub static METRICS: Lazy<Arc<MetricsCollector>> = Lazy::new(|| Arc::new(MetricsCollector::new()));

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RequestLabels {
    /// Store operation ("list", "create", "update", "delete", "like")
    pub operation: String,
    /// "success" or "error"
    pub status: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct OperationLabels {
    pub operation: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ErrorLabels {
    pub code: String,
}

pub struct MetricsCollector {
    registry: RwLock<Registry>,

    pub http_requests_total: Family<RequestLabels, Counter>,

    pub http_request_duration_seconds: Family<OperationLabels, Histogram>,

    pub api_errors_total: Family<ErrorLabels, Counter>,

    /// Records currently held by the store
    pub repositories_stored: Gauge,
}

impl MetricsCollector {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let http_requests_total = Family::<RequestLabels, Counter>::default();
        registry.register(
            "http_requests",
            "Total number of repository API requests",
            http_requests_total.clone(),
        );

        let http_request_duration_seconds =
            Family::<OperationLabels, Histogram>::new_with_constructor(|| {
                // 0.1ms .. ~0.5s
                Histogram::new(exponential_buckets(0.0001, 2.5, 10))
            });
        registry.register(
            "http_request_duration_seconds",
            "Repository API latency histogram in seconds",
            http_request_duration_seconds.clone(),
        );

        let api_errors_total = Family::<ErrorLabels, Counter>::default();
        registry.register(
            "api_errors",
            "Total number of rejected requests by error code",
            api_errors_total.clone(),
        );

        let repositories_stored = Gauge::default();
        registry.register(
            "repositories_stored",
            "Number of repositories currently stored",
            repositories_stored.clone(),
        );

        Self {
            registry: RwLock::new(registry),
            http_requests_total,
            http_request_duration_seconds,
            api_errors_total,
            repositories_stored,
        }
    }

    /// Encode metrics in Prometheus text format
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        let registry = self.registry.read();
        if let Err(error) = encode(&mut buffer, &registry) {
            tracing::warn!(%error, "failed to encode metrics");
        }
        buffer
    }

    pub fn record_request(&self, operation: &str, status: &str, duration: Duration) {
        self.http_requests_total
            .get_or_create(&RequestLabels {
                operation: operation.to_string(),
                status: status.to_string(),
            })
            .inc();

        self.http_request_duration_seconds
            .get_or_create(&OperationLabels {
                operation: operation.to_string(),
            })
            .observe(duration.as_secs_f64());
    }

    pub fn record_error(&self, code: ErrorCode) {
        self.api_errors_total
            .get_or_create(&ErrorLabels {
                code: code.as_str().to_string(),
            })
            .inc();
    }

    pub fn set_repository_count(&self, count: usize) {
        self.repositories_stored.set(count as i64);
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard timing one store operation.
///
/// A guard dropped without [`success`](Self::success) or
/// [`error`](Self::error) is recorded as an error.
pub struct RequestMetrics {
    operation: &'static str,
    start: Instant,
    completed: bool,
}

impl RequestMetrics {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
            completed: false,
        }
    }

    pub fn success(mut self) {
        METRICS.record_request(self.operation, "success", self.start.elapsed());
        self.completed = true;
    }

    pub fn error(mut self) {
        METRICS.record_request(self.operation, "error", self.start.elapsed());
        self.completed = true;
    }
}

impl Drop for RequestMetrics {
    fn drop(&mut self) {
        if !self.completed {
            METRICS.record_request(self.operation, "error", self.start.elapsed());
        }
    }
}
