//! User Portal visit providers.

pub mod client;
pub mod config;
pub mod error;
pub mod fixed;

use std::sync::Arc;

use retention_core::VisitProvider;
use tracing::info;

pub use client::PortalClient;
pub use config::PortalConfig;
pub use error::PortalError;
pub use fixed::StaticVisitProvider;

/// Builds the provider selected by `config`.
pub fn provider(config: &PortalConfig) -> Result<Arc<dyn VisitProvider>, PortalError> {
    if config.is_mock() {
        info!("Using static visit provider");
        let provider = match &config.fixtures {
            Some(path) => StaticVisitProvider::from_file(path)?,
            None => StaticVisitProvider::new(),
        };
        return Ok(Arc::new(provider));
    }

    info!(url = %config.url, "Using user portal at configured URL");
    Ok(Arc::new(PortalClient::new(config)?))
}
