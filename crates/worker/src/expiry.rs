//! Expiry sweep.
//!
//! Runs the idempotent expiry check over every dataset. A failure on one
//! dataset is logged and the sweep moves on.

use std::sync::Arc;
use std::time::Instant;

use dataset_service::DatasetService;
use retention_core::Result;
use telemetry::metrics;
use tracing::{debug, info, warn};

/// Outcome of one pass over the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub checked: usize,
    pub expired: Vec<String>,
    pub failed: Vec<String>,
}

pub struct ExpiryWorker {
    service: Arc<DatasetService>,
}

impl ExpiryWorker {
    pub fn new(service: Arc<DatasetService>) -> Self {
        Self { service }
    }

    /// Checks every dataset once. Only listing the EPNs can fail the sweep.
    pub async fn run(&self) -> Result<SweepReport> {
        let started = Instant::now();
        let epns = self.service.epns().await?;
        debug!(datasets = epns.len(), "Starting expiry sweep");

        let mut report = SweepReport::default();
        for epn in epns {
            report.checked += 1;
            match self.service.check_expiry(&epn).await {
                Ok(check) if check.changed => report.expired.push(epn),
                Ok(_) => {}
                Err(e) => {
                    warn!(epn = %epn, error = %e, "Expiry check failed");
                    report.failed.push(epn);
                }
            }
        }

        let elapsed = started.elapsed().as_millis() as u64;
        metrics().sweep_duration_ms.observe(elapsed);
        metrics().last_sweep_datasets.set(report.checked as u64);

        info!(
            checked = report.checked,
            expired = report.expired.len(),
            failed = report.failed.len(),
            duration_ms = elapsed,
            "Expiry sweep complete"
        );
        Ok(report)
    }
}
