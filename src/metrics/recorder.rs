//! Metrics recording implementation using Prometheus.

use prometheus::{
    register_gauge_with_registry, register_histogram_vec_with_registry, Encoder, Gauge,
    HistogramVec, Registry, TextEncoder,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Upper bounds of the request latency histogram, in milliseconds.
/// A `+Inf` bucket is always appended by the exposition.
pub const REQUEST_DURATION_BUCKETS_MS: [f64; 7] =
    [50.0, 100.0, 300.0, 500.0, 750.0, 1000.0, 2000.0];

/// One completed request, as seen by the latency recorder.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub method: String,
    /// Matched route pattern, or the raw path when nothing matched.
    pub route: String,
    pub status_code: u16,
    pub duration_ms: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
    #[error("metrics encoding produced invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Trait for recording request samples.
pub trait MetricsRecorder: Clone + Send + Sync + 'static {
    /// Records one completed request. Must not block.
    fn record(&self, sample: MetricSample);
}

/// Prometheus metrics collector.
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    request_duration_ms: HistogramVec,
    scheduler_lag_seconds: Gauge,
}

impl Metrics {
    /// Creates a fresh registry. Every exported series carries `app="<app_label>"`.
    pub fn new(app_label: &str) -> Result<Self, MetricsError> {
        let labels = HashMap::from([("app".to_string(), app_label.to_string())]);
        let registry = Arc::new(Registry::new_custom(None, Some(labels))?);

        let request_duration_ms = register_histogram_vec_with_registry!(
            "http_request_duration_ms",
            "Duration of HTTP requests in ms",
            &["method", "route", "status_code"],
            REQUEST_DURATION_BUCKETS_MS.to_vec(),
            registry.clone()
        )?;

        let scheduler_lag_seconds = register_gauge_with_registry!(
            "scheduler_lag_seconds",
            "Overshoot of a periodic timer on the async runtime, in seconds",
            registry.clone()
        )?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Metrics {
            registry,
            request_duration_ms,
            scheduler_lag_seconds,
        })
    }

    /// Serializes every registered metric family in the text exposition format.
    ///
    /// Reading does not mutate any counter, so two calls without intervening
    /// requests produce identical histogram lines.
    pub fn snapshot(&self) -> Result<Vec<u8>, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(buffer)
    }

    /// Renders all metrics in Prometheus text format.
    pub fn render(&self) -> Result<String, MetricsError> {
        Ok(String::from_utf8(self.snapshot()?)?)
    }

    pub fn set_scheduler_lag(&self, lag_secs: f64) {
        self.scheduler_lag_seconds.set(lag_secs);
    }
}

impl MetricsRecorder for Metrics {
    fn record(&self, sample: MetricSample) {
        let status = sample.status_code.to_string();
        self.request_duration_ms
            .with_label_values(&[sample.method.as_str(), sample.route.as_str(), status.as_str()])
            .observe(sample.duration_ms);
    }
}
