//! Shared application state.

use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::CredentialValidator;
use crate::config::ConfigV1;
use crate::metrics::Metrics;
use crate::services::{AuthService, JobsService};
use crate::store::Store;

/// State cloned into every handler and middleware.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ConfigV1>,
    /// Credential check used by the Auth Gate.
    pub validator: Arc<dyn CredentialValidator>,
    pub auth_service: Arc<dyn AuthService>,
    pub jobs_service: Arc<dyn JobsService>,
    pub metrics: Metrics,
    pub store: Arc<dyn Store>,
}

impl FromRef<AppState> for Metrics {
    fn from_ref(state: &AppState) -> Metrics {
        state.metrics.clone()
    }
}
