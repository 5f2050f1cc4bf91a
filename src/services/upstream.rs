use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use reqwest::{Client, Method};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::{AuthService, JobsService, Reply};
use crate::errors::AppError;
use crate::models::AuthContext;

/// Header carrying the authenticated identity to the upstream service.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Forwards route-group operations to a service reachable over HTTP.
pub struct HttpUpstream {
    name: String,
    base_url: Url,
    client: Client,
}

impl HttpUpstream {
    pub fn new(name: &str, base_url: &str, timeout: Duration) -> Result<Self, String> {
        let base_url =
            Url::parse(base_url).map_err(|e| format!("Invalid {} service URL: {}", name, e))?;
        if base_url.cannot_be_a_base() {
            return Err(format!("Invalid {} service URL: {}", name, base_url));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {}", e))?;

        Ok(HttpUpstream {
            name: name.to_string(),
            base_url,
            client,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn forward(
        &self,
        method: Method,
        segments: &[&str],
        context: Option<&AuthContext>,
        query: Option<&HashMap<String, String>>,
        body: Option<Value>,
    ) -> Result<Reply, AppError> {
        let url = self.endpoint(segments);
        debug!("Forwarding {} {} to {} service", method, url, self.name);

        let mut request = self.client.request(method, url);
        if let Some(context) = context {
            request = request.header(USER_ID_HEADER, &context.user_id);
        }
        if let Some(query) = query {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|e| {
            warn!("{} service unreachable: {}", self.name, e);
            AppError::with_status(
                StatusCode::BAD_GATEWAY,
                format!("{} service unavailable", self.name),
            )
        })?;

        let status = StatusCode::from_u16(response.status().as_u16())
            .unwrap_or(StatusCode::BAD_GATEWAY);
        let bytes = response.bytes().await.map_err(|e| {
            warn!("Failed to read {} service response: {}", self.name, e);
            AppError::with_status(
                StatusCode::BAD_GATEWAY,
                format!("{} service unavailable", self.name),
            )
        })?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        if status.is_server_error() {
            warn!("{} service failed with {}: {}", self.name, status, body);
            return Err(AppError::with_status(
                StatusCode::BAD_GATEWAY,
                format!("{} service failed", self.name),
            ));
        }
        if status.is_client_error() {
            let message = body
                .get("msg")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("Request failed")
                        .to_string()
                });
            return Err(AppError::with_status(status, message));
        }

        Ok(Reply::new(status, body))
    }
}

#[async_trait]
impl AuthService for HttpUpstream {
    async fn register(&self, body: Value) -> Result<Reply, AppError> {
        self.forward(Method::POST, &["register"], None, None, Some(body))
            .await
    }

    async fn login(&self, body: Value) -> Result<Reply, AppError> {
        self.forward(Method::POST, &["login"], None, None, Some(body))
            .await
    }

    async fn update_user(&self, context: &AuthContext, body: Value) -> Result<Reply, AppError> {
        self.forward(
            Method::PATCH,
            &["updateUser"],
            Some(context),
            None,
            Some(body),
        )
        .await
    }
}

#[async_trait]
impl JobsService for HttpUpstream {
    async fn create_job(&self, context: &AuthContext, body: Value) -> Result<Reply, AppError> {
        self.forward(Method::POST, &[], Some(context), None, Some(body))
            .await
    }

    async fn get_all_jobs(
        &self,
        context: &AuthContext,
        query: HashMap<String, String>,
    ) -> Result<Reply, AppError> {
        self.forward(Method::GET, &[], Some(context), Some(&query), None)
            .await
    }

    async fn show_stats(&self, context: &AuthContext) -> Result<Reply, AppError> {
        self.forward(Method::GET, &["stats"], Some(context), None, None)
            .await
    }

    async fn update_job(
        &self,
        context: &AuthContext,
        id: &str,
        body: Value,
    ) -> Result<Reply, AppError> {
        self.forward(Method::PATCH, &[id], Some(context), None, Some(body))
            .await
    }

    async fn delete_job(&self, context: &AuthContext, id: &str) -> Result<Reply, AppError> {
        self.forward(Method::DELETE, &[id], Some(context), None, None)
            .await
    }
}
