//! Application state shared across handlers.

use std::sync::Arc;

use dataset_service::DatasetService;
use retention_core::{Clock, LocalZone};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DatasetService>,
    /// Zone used to render and parse timestamps at the boundary
    pub zone: LocalZone,
}

impl AppState {
    pub fn new(service: Arc<DatasetService>, zone: LocalZone) -> Self {
        Self { service, zone }
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.service.clock().now()
    }
}
