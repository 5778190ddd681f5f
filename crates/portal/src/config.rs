//! User Portal configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Portal base URL; empty or "mock" selects the static provider
    #[serde(default)]
    pub url: String,
    /// API client name used to log in
    #[serde(default)]
    pub client: String,
    #[serde(default)]
    pub password: String,
    /// Verify the portal's TLS certificate
    #[serde(default = "default_verify")]
    pub verify: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// How long a login token is reused
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
    /// JSON file of EPN -> visit used by the static provider
    #[serde(default)]
    pub fixtures: Option<String>,
}

fn default_verify() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_token_ttl_secs() -> u64 {
    300
}

impl PortalConfig {
    /// Whether visits come from the static provider instead of the portal.
    pub fn is_mock(&self) -> bool {
        self.url.is_empty() || self.url == "mock"
    }
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            client: String::new(),
            password: String::new(),
            verify: default_verify(),
            timeout_secs: default_timeout_secs(),
            token_ttl_secs: default_token_ttl_secs(),
            fixtures: None,
        }
    }
}
