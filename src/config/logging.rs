use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// LoggingConfig controls how we initialize tracing/logging.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String, // e.g. "info", "debug", "warn"
    #[serde(default = "default_format")]
    pub format: String, // e.g. "json", "console"
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_service_version")]
    pub service_version: String,
    /// Remote collector; events are only forwarded when this is set.
    #[serde(default)]
    pub loki: Option<LokiConfig>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_level(),
            format: default_format(),
            service_name: default_service_name(),
            service_version: default_service_version(),
            loki: None,
        }
    }
}

/// Push settings for a Loki endpoint.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct LokiConfig {
    /// Base URL, e.g. `http://loki:3100`. The push path is appended.
    pub url: String,
    /// Static stream labels identifying this service.
    #[serde(default = "default_labels")]
    pub labels: BTreeMap<String, String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
    /// Events beyond this many pending ones are dropped.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "json".to_string()
}

fn default_service_name() -> String {
    "jobfront".to_string()
}

fn default_service_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_labels() -> BTreeMap<String, String> {
    BTreeMap::from([("job".to_string(), "jobfront".to_string())])
}

fn default_batch_size() -> usize {
    100
}

fn default_flush_interval_ms() -> u64 {
    1000
}

fn default_queue_capacity() -> usize {
    4096
}
