use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Connection settings for the MongoDB deployment backing the auth and jobs services.
///
/// The front end only needs the connection to exist: a failure to reach it at
/// startup keeps the listener from binding.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct StoreConfig {
    pub uri: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_database() -> String {
    "jobfront".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    5000
}
