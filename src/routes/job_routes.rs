//! Job endpoints under `/api/v1/jobs`. Every path below the prefix is gated,
//! including the ones that end up at the SPA.

use std::collections::HashMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::get;
use axum::{middleware, Extension, Json, Router};
use serde_json::Value;

use super::json_body;
use crate::auth::{auth_gate, authenticate};
use crate::middleware::sanitize::clean_param;
use crate::errors::AppError;
use crate::models::AuthContext;
use crate::services::Reply;
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(get_all_jobs).post(create_job))
        .route("/stats", get(show_stats))
        .route("/:id", axum::routing::patch(update_job).delete(delete_job))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_gate))
        .fallback(gated_fallback)
}

/// Unmatched paths under the prefix still need a credential before the SPA
/// document is served.
async fn gated_fallback(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    authenticate(&state, &headers).await?;
    super::spa::serve_index(State(state)).await
}

async fn create_job(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Reply, AppError> {
    state
        .jobs_service
        .create_job(&context, json_body(payload)?)
        .await
}

async fn get_all_jobs(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Reply, AppError> {
    state.jobs_service.get_all_jobs(&context, query).await
}

async fn show_stats(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
) -> Result<Reply, AppError> {
    state.jobs_service.show_stats(&context).await
}

async fn update_job(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Reply, AppError> {
    state
        .jobs_service
        .update_job(&context, &clean_param(id), json_body(payload)?)
        .await
}

async fn delete_job(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Reply, AppError> {
    state
        .jobs_service
        .delete_job(&context, &clean_param(id))
        .await
}
