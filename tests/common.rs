#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use chrono::Utc;
use figment::providers::{Format, Yaml};
use figment::Figment;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};

use jobfront::auth::jwt_validator::Claims;
use jobfront::auth::JwtValidator;
use jobfront::config::{load_config_from, ConfigV1};
use jobfront::errors::AppError;
use jobfront::metrics::Metrics;
use jobfront::models::AuthContext;
use jobfront::routes::create_router;
use jobfront::services::{AuthService, JobsService, Reply};
use jobfront::state::AppState;
use jobfront::store::Store;

pub const JWT_SECRET: &str = "integration-secret";
pub const INDEX_HTML: &str = "<!doctype html><html><body><div id=\"root\"></div></body></html>";
pub const MAIN_JS: &str = "console.log(\"jobs ui\");";

const TEST_CONFIG: &str = r#"
version: "1.0.0"
mode: production
store:
  uri: mongodb://localhost:27017
auth:
  jwt_secret: integration-secret
services:
  auth_url: http://127.0.0.1:9/api/v1/auth
  jobs_url: http://127.0.0.1:9/api/v1/jobs
metrics:
  app_label: my-backend-server
logging:
  level: debug
  format: json
"#;

pub fn load_test_config(static_root: &Path) -> ConfigV1 {
    let mut config = load_config_from(Figment::new().merge(Yaml::string(TEST_CONFIG)))
        .expect("Failed to parse test config YAML");
    config.static_files.root = static_root.to_path_buf();
    config
}

/// A throwaway SPA bundle: `index.html` plus one asset.
pub struct StaticRoot {
    pub path: PathBuf,
}

impl StaticRoot {
    pub fn create() -> Self {
        let path = std::env::temp_dir().join(format!("jobfront-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(path.join("static/js")).expect("create static root");
        std::fs::write(path.join("index.html"), INDEX_HTML).expect("write index");
        std::fs::write(path.join("static/js/main.js"), MAIN_JS).expect("write asset");
        StaticRoot { path }
    }
}

impl Drop for StaticRoot {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

pub struct FakeStore {
    pub healthy: bool,
}

#[async_trait]
impl Store for FakeStore {
    fn get_name(&self) -> &str {
        "fake"
    }

    async fn ping(&self) -> Result<(), String> {
        if self.healthy {
            Ok(())
        } else {
            Err("connection refused".to_string())
        }
    }
}

/// Echoes what it was given so tests can see what reached the collaborator.
pub struct FakeAuth;

#[async_trait]
impl AuthService for FakeAuth {
    async fn register(&self, body: Value) -> Result<Reply, AppError> {
        Ok(Reply::new(StatusCode::CREATED, json!({ "user": body })))
    }

    async fn login(&self, body: Value) -> Result<Reply, AppError> {
        match body.get("password").and_then(Value::as_str) {
            Some("secret") => Ok(Reply::new(StatusCode::OK, json!({ "token": "t" }))),
            _ => Err(AppError::with_status(
                StatusCode::UNAUTHORIZED,
                "Invalid Credentials",
            )),
        }
    }

    async fn update_user(&self, context: &AuthContext, body: Value) -> Result<Reply, AppError> {
        Ok(Reply::new(
            StatusCode::OK,
            json!({ "userId": context.user_id, "user": body }),
        ))
    }
}

/// Jobs collaborator recording every call it receives.
#[derive(Clone, Default)]
pub struct FakeJobs {
    pub calls: Arc<Mutex<Vec<String>>>,
    /// When set, listing jobs fails with an unlabeled error.
    pub failing: bool,
}

impl FakeJobs {
    fn called(&self, operation: impl Into<String>) {
        self.calls.lock().unwrap().push(operation.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobsService for FakeJobs {
    async fn create_job(&self, context: &AuthContext, body: Value) -> Result<Reply, AppError> {
        self.called("create_job");
        Ok(Reply::new(
            StatusCode::CREATED,
            json!({ "job": body, "createdBy": context.user_id }),
        ))
    }

    async fn get_all_jobs(
        &self,
        context: &AuthContext,
        query: HashMap<String, String>,
    ) -> Result<Reply, AppError> {
        self.called("get_all_jobs");
        if self.failing {
            return Err(AppError::internal(
                "MongoServerError: E11000 duplicate key error collection: jobs",
            ));
        }
        let query: BTreeMap<_, _> = query.into_iter().collect();
        Ok(Reply::new(
            StatusCode::OK,
            json!({ "jobs": [], "totalJobs": 0, "numOfPages": 1, "userId": context.user_id, "query": query }),
        ))
    }

    async fn show_stats(&self, _context: &AuthContext) -> Result<Reply, AppError> {
        self.called("show_stats");
        Ok(Reply::new(
            StatusCode::OK,
            json!({ "defaultStats": { "pending": 0, "interview": 0, "declined": 0 } }),
        ))
    }

    async fn update_job(
        &self,
        _context: &AuthContext,
        id: &str,
        _body: Value,
    ) -> Result<Reply, AppError> {
        self.called(format!("update_job:{}", id));
        Err(AppError::not_found(format!("No job with id :{}", id)))
    }

    async fn delete_job(&self, _context: &AuthContext, id: &str) -> Result<Reply, AppError> {
        self.called(format!("delete_job:{}", id));
        panic!("job store poisoned while deleting {}", id);
    }
}

pub struct TestApp {
    pub router: Router,
    pub metrics: Metrics,
    pub jobs: FakeJobs,
    pub static_root: StaticRoot,
}

pub fn build_app(jobs: FakeJobs) -> TestApp {
    build_app_with_store(jobs, true)
}

pub fn build_app_with_store(jobs: FakeJobs, healthy_store: bool) -> TestApp {
    let static_root = StaticRoot::create();
    let config = Arc::new(load_test_config(&static_root.path));
    let metrics = Metrics::new(&config.metrics.app_label).expect("metrics registry");

    let state = AppState {
        validator: Arc::new(JwtValidator::new(&config.auth)),
        auth_service: Arc::new(FakeAuth),
        jobs_service: Arc::new(jobs.clone()),
        metrics: metrics.clone(),
        store: Arc::new(FakeStore {
            healthy: healthy_store,
        }),
        config,
    };

    TestApp {
        router: create_router(state),
        metrics,
        jobs,
        static_root,
    }
}

pub fn mint_token(user_id: &str, secret: &str, ttl_seconds: i64) -> String {
    let claims = Claims {
        user_id: user_id.to_string(),
        exp: Utc::now().timestamp() + ttl_seconds,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("failed to mint token")
}

pub fn request(method: Method, path: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .body(Body::empty())
        .expect("failed to build request")
}

pub fn request_with_bearer(method: Method, path: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .expect("failed to build request")
}

pub fn json_request(method: Method, path: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(path)
        .header("Content-Type", "application/json");
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("failed to build request")
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    String::from_utf8(bytes.to_vec()).expect("body is not UTF-8")
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_text(response).await).expect("body is not JSON")
}

fn parse_labels(series: &str) -> Option<HashMap<&str, &str>> {
    let (_, rest) = series.split_once('{')?;
    let (labels, _) = rest.rsplit_once('}')?;
    Some(
        labels
            .split(',')
            .filter_map(|pair| pair.split_once('='))
            .map(|(k, v)| (k, v.trim_matches('"')))
            .collect(),
    )
}

/// Number of samples recorded for one label tuple.
pub fn sample_count(exposition: &str, method: &str, route: &str, status: u16) -> u64 {
    let status = status.to_string();
    exposition
        .lines()
        .filter(|line| line.starts_with("http_request_duration_ms_count{"))
        .filter_map(|line| {
            let labels = parse_labels(line)?;
            let matches = labels.get("method") == Some(&method)
                && labels.get("route") == Some(&route)
                && labels.get("status_code") == Some(&status.as_str());
            let value = line.rsplit(' ').next()?.parse::<u64>().ok()?;
            matches.then_some(value)
        })
        .sum()
}

/// Number of samples recorded across every label tuple.
pub fn total_samples(exposition: &str) -> u64 {
    exposition
        .lines()
        .filter(|line| line.starts_with("http_request_duration_ms_count{"))
        .filter_map(|line| line.rsplit(' ').next()?.parse::<u64>().ok())
        .sum()
}
