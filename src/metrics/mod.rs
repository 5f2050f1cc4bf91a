//! Metrics collection and exposition for Prometheus.
//!
//! This module provides the request-latency registry, the middleware that feeds
//! it, and the scheduler lag probe.

mod lag;
mod latency;
mod recorder;

pub use lag::spawn_lag_probe;
pub use latency::{record_latency, RequestOutcome, RouteSlot, CLIENT_CLOSED_REQUEST};
pub use recorder::{
    MetricSample, Metrics, MetricsError, MetricsRecorder, REQUEST_DURATION_BUCKETS_MS,
};
