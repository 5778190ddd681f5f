use std::sync::Arc;

use retention_core::{Clock, DatasetStore, Error, PolicyStore, Result, SystemClock, VisitProvider};
use telemetry::metrics;
use tokio::sync::RwLock;
use tracing::{error, warn};

/// Application service over the dataset and policy stores.
///
/// Commands are serialized per EPN through the store's check-and-set; the
/// service itself holds no mutable state and is shared behind an `Arc`.
pub struct DatasetService {
    pub(crate) datasets: Arc<dyn DatasetStore>,
    pub(crate) policies: Arc<dyn PolicyStore>,
    pub(crate) visits: Arc<dyn VisitProvider>,
    pub(crate) clock: Arc<dyn Clock>,
    /// Shared while a dataset takes a policy snapshot, exclusive while a
    /// policy is deleted.
    pub(crate) policy_refs: RwLock<()>,
}

impl DatasetService {
    pub fn new(
        datasets: Arc<dyn DatasetStore>,
        policies: Arc<dyn PolicyStore>,
        visits: Arc<dyn VisitProvider>,
    ) -> Self {
        Self::with_clock(datasets, policies, visits, Arc::new(SystemClock))
    }

    pub fn with_clock(
        datasets: Arc<dyn DatasetStore>,
        policies: Arc<dyn PolicyStore>,
        visits: Arc<dyn VisitProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            datasets,
            policies,
            visits,
            clock,
            policy_refs: RwLock::new(()),
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Checks both stores respond.
    pub async fn ping(&self) -> Result<()> {
        self.datasets.ping().await?;
        self.policies.ping().await
    }

    pub(crate) fn record_failure(&self, command: &str, key: &str, err: &Error) {
        metrics().command_failures.inc();
        if err.is_client_error() {
            warn!(command, key, code = err.code(), error = %err, "Command rejected");
        } else {
            error!(command, key, code = err.code(), error = %err, "Command failed");
        }
    }
}
