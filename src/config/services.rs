use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Settings for the Auth Gate's credential validation.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct AuthConfig {
    /// HS256 secret shared with the auth service that issues the tokens.
    pub jwt_secret: String,
}

/// Where the auth and jobs route groups are forwarded to.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ServicesConfig {
    pub auth_url: String,
    pub jobs_url: String,
    #[serde(default = "default_timeout_in_ms")]
    pub timeout_in_ms: u64,
}

fn default_timeout_in_ms() -> u64 {
    5000
}
