use std::path::PathBuf;

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use super::logging::LoggingConfig;
use super::services::{AuthConfig, ServicesConfig};
use super::store::StoreConfig;

/// A top-level enum for versioned configurations.
#[derive(Deserialize, Serialize, JsonSchema)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1.0.0")]
    ConfigV1(ConfigV1),
}

/// Main config for v1.0.0.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ConfigV1 {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub mode: Mode,
    pub store: StoreConfig,
    pub auth: AuthConfig,
    pub services: ServicesConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub static_files: StaticFilesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ConfigV1 {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Deployment mode. Development enables per-request access logging.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Development,
    Production,
}

#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct MetricsConfig {
    /// Value of the static `app` label attached to every exported series.
    #[serde(default = "default_app_label")]
    pub app_label: String,
    #[serde(default = "default_lag_probe_interval_ms")]
    pub lag_probe_interval_ms: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        MetricsConfig {
            app_label: default_app_label(),
            lag_probe_interval_ms: default_lag_probe_interval_ms(),
        }
    }
}

/// Location of the single-page application's build output.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct StaticFilesConfig {
    #[serde(default = "default_static_root")]
    pub root: PathBuf,
    #[serde(default = "default_index")]
    pub index: String,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        StaticFilesConfig {
            root: default_static_root(),
            index: default_index(),
        }
    }
}

/// Layered configuration sources, lowest priority first:
/// built-in version tag, `./config.yaml`, `JOBFRONT_*` variables (`__` nests),
/// then the conventional deployment variables.
pub fn figment() -> Figment {
    Figment::new()
        .merge(Serialized::default("version", "1.0.0"))
        .merge(Yaml::file("./config.yaml"))
        .merge(Env::prefixed("JOBFRONT_").split("__"))
        .merge(Env::raw().filter_map(|key| {
            let mapped = match key.as_str().to_ascii_uppercase().as_str() {
                "PORT" => "port",
                "APP_MODE" => "mode",
                "MONGO_URL" => "store.uri",
                "MONGO_DATABASE" => "store.database",
                "JWT_SECRET" => "auth.jwt_secret",
                _ => return None,
            };
            Some(mapped.into())
        }))
}

/// Extracts a `ConfigV1` from the given figment.
pub fn load_config_from(figment: Figment) -> Result<ConfigV1, figment::Error> {
    match figment.extract::<Config>()? {
        Config::ConfigV1(c) => Ok(c),
    }
}

/// Load config from `./config.yaml` and the environment.
pub fn load_config() -> Result<ConfigV1, figment::Error> {
    load_config_from(figment())
}

/// Print the JSON schema for the configuration to stdout.
pub fn print_schema() -> Result<(), serde_json::Error> {
    let schema = schema_for!(Config);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_app_label() -> String {
    "jobfront".to_string()
}

fn default_lag_probe_interval_ms() -> u64 {
    500
}

fn default_static_root() -> PathBuf {
    PathBuf::from("./client/build")
}

fn default_index() -> String {
    "index.html".to_string()
}
