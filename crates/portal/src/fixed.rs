//! Static visit provider for development and tests.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use parking_lot::RwLock;
use retention_core::{Error, PortalErrorKind, Result, Visit, VisitProvider};
use tracing::info;

use crate::error::PortalError;

/// Visits held in memory, keyed by EPN.
#[derive(Debug, Default)]
pub struct StaticVisitProvider {
    visits: RwLock<HashMap<String, Visit>>,
    /// When set, every lookup fails with this error
    outage: RwLock<Option<PortalError>>,
}

impl StaticVisitProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a JSON object mapping EPN to visit.
    pub fn from_file(path: impl AsRef<Path>) -> std::result::Result<Self, PortalError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| PortalError::Config(format!("{}: {}", path.display(), e)))?;
        let visits: HashMap<String, Visit> = serde_json::from_str(&raw)
            .map_err(|e| PortalError::Config(format!("{}: {}", path.display(), e)))?;

        info!(path = %path.display(), visits = visits.len(), "Loaded visit fixtures");
        Ok(Self {
            visits: RwLock::new(visits),
            outage: RwLock::new(None),
        })
    }

    pub fn insert(&self, epn: impl Into<String>, visit: Visit) {
        self.visits.write().insert(epn.into(), visit);
    }

    pub fn remove(&self, epn: &str) -> Option<Visit> {
        self.visits.write().remove(epn)
    }

    /// Makes subsequent lookups fail until `clear_outage`.
    pub fn fail_with(&self, error: PortalError) {
        *self.outage.write() = Some(error);
    }

    pub fn clear_outage(&self) {
        *self.outage.write() = None;
    }
}

#[async_trait]
impl VisitProvider for StaticVisitProvider {
    async fn resolve(&self, epn: &str) -> Result<Visit> {
        if let Some(err) = self.outage.read().clone() {
            return Err(err.into());
        }
        self.visits.read().get(epn).cloned().ok_or_else(|| {
            Error::portal(
                PortalErrorKind::UnknownVisit,
                format!("no visit for EPN {}", epn),
            )
        })
    }
}
