//! Health check endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use tracing::warn;

use crate::errors::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// 200 `OK` while the store answers a ping, 503 otherwise.
async fn health_check(State(state): State<AppState>) -> Result<&'static str, AppError> {
    state.store.ping().await.map_err(|e| {
        warn!("Health check failed on {} store: {}", state.store.get_name(), e);
        AppError::with_status(StatusCode::SERVICE_UNAVAILABLE, "Storage unavailable")
    })?;
    Ok("OK")
}
