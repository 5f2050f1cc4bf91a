//! Request latency middleware.
//!
//! Every request passing through [`record_latency`] owns one [`RequestOutcome`].
//! The outcome is finalized in `Drop`, so a sample is recorded whether the
//! inner service returns a response, translates an error, or is cancelled
//! because the client went away.

use std::sync::{Arc, OnceLock};
use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use tracing::{info, warn};
use uuid::Uuid;

use super::recorder::{MetricSample, MetricsRecorder};

/// Status recorded when the response future is dropped before completing.
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

/// Per-request slot the router fills with the matched route pattern.
///
/// Inserted into the request extensions by [`record_latency`]; the route layer
/// writes it once dispatch has found a route.
#[derive(Clone, Debug, Default)]
pub struct RouteSlot(Arc<OnceLock<String>>);

impl RouteSlot {
    pub fn set(&self, pattern: &str) {
        // First writer wins; nested dispatch never overrides the outer match.
        let _ = self.0.set(pattern.to_owned());
    }

    pub fn get(&self) -> Option<&str> {
        self.0.get().map(String::as_str)
    }
}

/// Timing state for a single in-flight request.
pub struct RequestOutcome<R: MetricsRecorder> {
    recorder: R,
    started: Instant,
    request_id: Uuid,
    method: String,
    raw_path: String,
    route: RouteSlot,
    status: Option<StatusCode>,
}

impl<R: MetricsRecorder> RequestOutcome<R> {
    pub fn start(recorder: R, method: &str, raw_path: &str, route: RouteSlot) -> Self {
        RequestOutcome {
            recorder,
            started: Instant::now(),
            request_id: Uuid::new_v4(),
            method: method.to_owned(),
            raw_path: raw_path.to_owned(),
            route,
            status: None,
        }
    }

    /// Marks the request as answered with `status`. The sample itself is
    /// recorded when the outcome is dropped.
    pub fn finish(mut self, status: StatusCode) {
        self.status = Some(status);
    }
}

impl<R: MetricsRecorder> Drop for RequestOutcome<R> {
    fn drop(&mut self) {
        let duration_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        let route = self.route.get().unwrap_or(&self.raw_path).to_owned();
        let status_code = self
            .status
            .map(|status| status.as_u16())
            .unwrap_or(CLIENT_CLOSED_REQUEST);

        if self.status.is_some() {
            info!(
                request_id = %self.request_id,
                method = %self.method,
                route = %route,
                status = status_code,
                duration_ms,
                "request completed"
            );
        } else {
            warn!(
                request_id = %self.request_id,
                method = %self.method,
                route = %route,
                status = status_code,
                duration_ms,
                "client closed request before a response was produced"
            );
        }

        self.recorder.record(MetricSample {
            method: std::mem::take(&mut self.method),
            route,
            status_code,
            duration_ms,
        });
    }
}

/// Middleware timing the rest of the pipeline and recording one sample per request.
///
/// Use with `axum::middleware::from_fn_with_state(recorder, record_latency::<R>)`.
pub async fn record_latency<R: MetricsRecorder>(
    State(recorder): State<R>,
    mut request: Request,
    next: Next,
) -> Response {
    let slot = RouteSlot::default();
    request.extensions_mut().insert(slot.clone());
    let outcome = RequestOutcome::start(
        recorder,
        request.method().as_str(),
        request.uri().path(),
        slot,
    );

    let response = next.run(request).await;
    outcome.finish(response.status());
    response
}
