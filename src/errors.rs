//! Error translation.
//!
//! Every failure on the request path ends up as an [`AppError`]. Its
//! `IntoResponse` impl is the only place user-visible error bodies are built;
//! diagnostics travel next to the response as an [`ErrorReport`] extension and
//! are logged by [`log_errors`] once the route label is known.

use std::any::Any;
use std::backtrace::Backtrace;

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use tracing::{error, warn};

use crate::metrics::RouteSlot;

const GENERIC_MESSAGE: &str = "Something went wrong, try again later";
const UNAUTHORIZED_MESSAGE: &str = "Authentication Invalid";
pub const ROUTE_NOT_FOUND_MESSAGE: &str = "Route does not exist";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing or invalid credential on a protected route.
    #[error("{}", UNAUTHORIZED_MESSAGE)]
    Unauthorized,
    /// No matching resource.
    #[error("{0}")]
    NotFound(String),
    /// Any other failure. `status` is `None` for errors nobody labeled.
    #[error("{message}")]
    Application {
        status: Option<StatusCode>,
        message: String,
        stack: Option<String>,
    },
}

/// Terminal state a translated request ended in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    NotFound,
    Application,
}

/// Diagnostic detail for a translated error. Never serialized into the body.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub resolution: Resolution,
    pub message: String,
    pub stack: Option<String>,
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    /// An error whose message is meant for the client.
    pub fn with_status(status: StatusCode, message: impl Into<String>) -> Self {
        AppError::Application {
            status: Some(status),
            message: message.into(),
            stack: None,
        }
    }

    /// An unlabeled failure: answered with a generic 500, logged with a backtrace.
    pub fn internal(err: impl std::fmt::Display) -> Self {
        AppError::Application {
            status: None,
            message: err.to_string(),
            stack: Some(Backtrace::force_capture().to_string()),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Application { status, .. } => {
                status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    /// Maps the error to the status and body the client sees.
    pub fn translate(&self) -> (StatusCode, Value) {
        let msg = match self {
            AppError::Unauthorized => UNAUTHORIZED_MESSAGE,
            AppError::NotFound(message) => message.as_str(),
            AppError::Application {
                status: Some(_),
                message,
                ..
            } => message.as_str(),
            AppError::Application { status: None, .. } => GENERIC_MESSAGE,
        };
        (self.status(), json!({ "msg": msg }))
    }

    fn report(self) -> ErrorReport {
        let message = self.to_string();
        match self {
            AppError::NotFound(_) => ErrorReport {
                resolution: Resolution::NotFound,
                message,
                stack: None,
            },
            AppError::Unauthorized => ErrorReport {
                resolution: Resolution::Application,
                message,
                stack: None,
            },
            AppError::Application { stack, .. } => ErrorReport {
                resolution: Resolution::Application,
                message,
                stack,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.translate();
        let mut response = (status, Json(body)).into_response();
        response.extensions_mut().insert(self.report());
        response
    }
}

/// Panic handler for `CatchPanicLayer::custom`.
pub fn translate_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    AppError::internal(format!("handler panicked: {}", detail)).into_response()
}

/// Emits the log event for any response carrying an [`ErrorReport`].
pub async fn log_errors(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let raw_path = request.uri().path().to_owned();
    let slot = request.extensions().get::<RouteSlot>().cloned();

    let response = next.run(request).await;

    if let Some(report) = response.extensions().get::<ErrorReport>() {
        let route = slot
            .as_ref()
            .and_then(RouteSlot::get)
            .unwrap_or(raw_path.as_str());
        let status = response.status().as_u16();
        if response.status().is_server_error() {
            error!(
                method = %method,
                route,
                status,
                stack = report.stack.as_deref(),
                "Error: {}",
                report.message
            );
        } else {
            warn!(
                method = %method,
                route,
                status,
                resolution = ?report.resolution,
                "Error: {}",
                report.message
            );
        }
    }

    response
}
