//! Metrics exposition endpoint.

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use crate::errors::AppError;
use crate::metrics::Metrics;
use crate::state::AppState;

pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Creates the metrics route. Never gated: restrict it at the ingress if the
/// service is exposed publicly.
pub fn routes() -> Router<AppState> {
    Router::new().route("/metrics", get(metrics_handler))
}

async fn metrics_handler(State(metrics): State<Metrics>) -> Result<impl IntoResponse, AppError> {
    let snapshot = metrics.snapshot().map_err(AppError::internal)?;
    Ok(([(CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)], snapshot))
}
