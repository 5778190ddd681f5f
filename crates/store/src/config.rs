//! Store configuration.

use serde::{Deserialize, Serialize};

/// Which store implementation backs the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local maps, lost on restart
    #[default]
    Memory,
    /// Single-file SQLite database
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// SQLite database file
    #[serde(default = "default_path")]
    pub path: String,
    /// SQLite busy timeout
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_path() -> String {
    "datastore.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}
