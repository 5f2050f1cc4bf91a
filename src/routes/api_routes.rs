//! Public API root.

use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/v1", get(welcome))
}

async fn welcome() -> Json<&'static str> {
    Json("Welcome!")
}
