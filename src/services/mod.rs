//! Seams to the auth and jobs services.
//!
//! The front end owns routing, gating and instrumentation; the business logic
//! behind each route lives in these collaborators.

pub mod upstream;

use std::collections::HashMap;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;

use crate::errors::AppError;
use crate::models::AuthContext;

pub use upstream::HttpUpstream;

/// A successful collaborator answer, relayed to the client as JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
}

impl Reply {
    pub fn new(status: StatusCode, body: Value) -> Self {
        Reply { status, body }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Account operations mounted under `/api/v1/auth`.
#[async_trait]
pub trait AuthService: Send + Sync {
    async fn register(&self, body: Value) -> Result<Reply, AppError>;
    async fn login(&self, body: Value) -> Result<Reply, AppError>;
    async fn update_user(&self, context: &AuthContext, body: Value) -> Result<Reply, AppError>;
}

/// Job operations mounted under `/api/v1/jobs`. Every call is on behalf of an
/// authenticated user.
#[async_trait]
pub trait JobsService: Send + Sync {
    async fn create_job(&self, context: &AuthContext, body: Value) -> Result<Reply, AppError>;
    async fn get_all_jobs(
        &self,
        context: &AuthContext,
        query: HashMap<String, String>,
    ) -> Result<Reply, AppError>;
    async fn show_stats(&self, context: &AuthContext) -> Result<Reply, AppError>;
    async fn update_job(
        &self,
        context: &AuthContext,
        id: &str,
        body: Value,
    ) -> Result<Reply, AppError>;
    async fn delete_job(&self, context: &AuthContext, id: &str) -> Result<Reply, AppError>;
}
