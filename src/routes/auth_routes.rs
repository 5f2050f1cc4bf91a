//! Account endpoints under `/api/v1/auth`.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{patch, post};
use axum::{middleware, Extension, Json, Router};
use serde_json::Value;

use super::json_body;
use crate::auth::auth_gate;
use crate::errors::AppError;
use crate::models::AuthContext;
use crate::services::Reply;
use crate::state::AppState;

/// `register` and `login` are public; `updateUser` sits behind the Auth Gate.
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route(
            "/updateUser",
            patch(update_user).route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_gate,
            )),
        )
}

async fn register(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Reply, AppError> {
    state.auth_service.register(json_body(payload)?).await
}

async fn login(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Reply, AppError> {
    state.auth_service.login(json_body(payload)?).await
}

async fn update_user(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Reply, AppError> {
    state
        .auth_service
        .update_user(&context, json_body(payload)?)
        .await
}
