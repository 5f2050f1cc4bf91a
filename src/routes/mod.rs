//! HTTP route definitions and the request pipeline around them.
//!
//! Layers, outermost first: security headers, sanitization, latency
//! recording, access logging (outside production), error logging, panic
//! translation, static assets, then dispatch. Matched patterns are written
//! into the request's [`RouteSlot`] by a route layer so the outer layers can
//! label what they observed.

mod api_routes;
mod auth_routes;
mod health_routes;
mod job_routes;
mod metrics_routes;
mod spa;

pub use metrics_routes::EXPOSITION_CONTENT_TYPE;

use axum::extract::rejection::JsonRejection;
use axum::extract::{MatchedPath, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Json, Router};
use serde_json::Value;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::config::Mode;
use crate::errors::{log_errors, translate_panic, AppError};
use crate::metrics::{record_latency, Metrics, RouteSlot};
use crate::middleware::{sanitize, serve_static, with_security_headers};
use crate::state::AppState;

/// Builds the full application: routes, SPA fallback and every layer of the
/// pipeline.
pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        .merge(api_routes::routes())
        .nest("/api/v1/auth", auth_routes::routes(&state))
        .nest("/api/v1/jobs", job_routes::routes(&state))
        .merge(metrics_routes::routes())
        .merge(health_routes::routes())
        .route_layer(middleware::from_fn(surface_route))
        .fallback(spa::serve_index)
        .layer(middleware::from_fn_with_state(state.clone(), serve_static))
        .layer(CatchPanicLayer::custom(translate_panic))
        .layer(middleware::from_fn(log_errors));

    let router = if state.config.mode == Mode::Production {
        router
    } else {
        router.layer(TraceLayer::new_for_http())
    };

    let router = router
        .layer(middleware::from_fn_with_state(
            state.metrics.clone(),
            record_latency::<Metrics>,
        ))
        .layer(middleware::from_fn(sanitize));

    with_security_headers(router).with_state(state)
}

/// Copies the matched route pattern into the request's [`RouteSlot`].
async fn surface_route(request: Request, next: Next) -> Response {
    if let (Some(matched), Some(slot)) = (
        request.extensions().get::<MatchedPath>(),
        request.extensions().get::<RouteSlot>(),
    ) {
        slot.set(matched.as_str());
    }
    next.run(request).await
}

/// Unwraps a JSON body, turning extractor rejections into labeled errors.
fn json_body(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, AppError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppError::with_status(rejection.status(), rejection.body_text()))
}
