//! Remote API endpoint configuration.

use serde::{Deserialize, Serialize};

/// Connection settings for the resource-management API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteConfig {
    /// Base URL of the API, e.g. `https://api.region.example.com`.
    #[serde(default)]
    pub endpoint: String,

    /// Environment variable holding the bearer token for API calls.
    /// Leave the variable unset for anonymous access (local test servers).
    #[serde(default = "default_auth_token_env")]
    pub auth_token_env: String,

    /// Per-call timeout in seconds. Timeouts are per remote call, not per run.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Page size requested from list/search endpoints.
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            auth_token_env: default_auth_token_env(),
            timeout_secs: default_timeout_secs(),
            page_limit: default_page_limit(),
        }
    }
}

fn default_auth_token_env() -> String {
    "CLOUDKEEPER_TOKEN".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_page_limit() -> u32 {
    1000
}
