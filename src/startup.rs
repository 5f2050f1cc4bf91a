//! Application startup and server initialization.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::auth::JwtValidator;
use crate::config::ConfigV1;
use crate::metrics::{spawn_lag_probe, Metrics, MetricsError};
use crate::routes;
use crate::services::HttpUpstream;
use crate::state::AppState;
use crate::store::connect_store;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("storage unavailable: {0}")]
    Storage(String),
    #[error("failed to initialise metrics: {0}")]
    Metrics(#[from] MetricsError),
    #[error("invalid upstream service: {0}")]
    Upstream(String),
    #[error("could not bind to {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Serve(std::io::Error),
}

/// Wires the collaborators from configuration.
///
/// The store is connected first; when it does not answer, nothing else is
/// built and no port is bound.
pub async fn build_state(config: Arc<ConfigV1>) -> Result<AppState, StartupError> {
    let store = connect_store(&config.store)
        .await
        .map_err(StartupError::Storage)?;

    let timeout = Duration::from_millis(config.services.timeout_in_ms);
    let auth_service = HttpUpstream::new("Auth", &config.services.auth_url, timeout)
        .map_err(StartupError::Upstream)?;
    let jobs_service = HttpUpstream::new("Jobs", &config.services.jobs_url, timeout)
        .map_err(StartupError::Upstream)?;

    let metrics = Metrics::new(&config.metrics.app_label)?;

    Ok(AppState {
        validator: Arc::new(JwtValidator::new(&config.auth)),
        auth_service: Arc::new(auth_service),
        jobs_service: Arc::new(jobs_service),
        metrics,
        store,
        config,
    })
}

/// Initializes and runs the application server until a shutdown signal.
pub async fn run(config: Arc<ConfigV1>) -> Result<(), StartupError> {
    let state = build_state(config.clone()).await?;

    let lag_probe = spawn_lag_probe(
        state.metrics.clone(),
        Duration::from_millis(config.metrics.lag_probe_interval_ms.max(1)),
    );

    let address = config.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.clone(),
            source,
        })?;
    info!("Server is listening on {} ({:?} mode)", address, config.mode);

    let app = routes::create_router(state);
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    lag_probe.abort();
    served.map_err(StartupError::Serve)?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received, draining connections");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        AuthConfig, LoggingConfig, MetricsConfig, Mode, ServicesConfig, StaticFilesConfig,
        StoreConfig,
    };

    fn config() -> ConfigV1 {
        ConfigV1 {
            host: "127.0.0.1".to_string(),
            port: 0,
            mode: Mode::Production,
            store: StoreConfig {
                uri: "mongodb://127.0.0.1:9/?directConnection=true".to_string(),
                database: "jobfront".to_string(),
                connect_timeout_ms: 200,
            },
            auth: AuthConfig {
                jwt_secret: "secret".to_string(),
            },
            services: ServicesConfig {
                auth_url: "http://127.0.0.1:9/api/v1/auth".to_string(),
                jobs_url: "http://127.0.0.1:9/api/v1/jobs".to_string(),
                timeout_in_ms: 200,
            },
            metrics: MetricsConfig::default(),
            static_files: StaticFilesConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    #[tokio::test]
    async fn unreachable_store_prevents_startup() {
        let err = run(Arc::new(config())).await.unwrap_err();
        assert!(matches!(err, StartupError::Storage(_)));
    }
}
