//! Catch-all serving the single-page application's entry document.

use std::path::Path;

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use crate::errors::{AppError, ROUTE_NOT_FOUND_MESSAGE};
use crate::state::AppState;

/// Answers any unmatched method and path with the SPA entry document and 200.
/// The client-side router takes it from there.
pub async fn serve_index(State(state): State<AppState>) -> Result<Response, AppError> {
    let static_files = &state.config.static_files;
    let index = Path::new(&static_files.root).join(&static_files.index);

    let document = tokio::fs::read(&index).await.map_err(|e| {
        error!("Failed to read SPA entry document {}: {}", index.display(), e);
        AppError::not_found(ROUTE_NOT_FOUND_MESSAGE)
    })?;

    Ok((
        StatusCode::OK,
        [(CONTENT_TYPE, "text/html; charset=utf-8")],
        document,
    )
        .into_response())
}
