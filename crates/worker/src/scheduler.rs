//! Worker scheduler for background tasks.

use std::sync::Arc;
use std::time::Duration;

use dataset_service::DatasetService;
use serde::{Deserialize, Serialize};
use telemetry::metrics;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::expiry::ExpiryWorker;

/// Worker scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Run the periodic expiry sweep
    pub enabled: bool,
    /// Seconds between expiry sweeps
    pub expiry_interval_secs: u64,
    /// Seconds between metrics reports in the log
    pub metrics_interval_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            expiry_interval_secs: 3600,
            metrics_interval_secs: 300,
        }
    }
}

impl WorkerConfig {
    pub fn expiry_interval(&self) -> Duration {
        Duration::from_secs(self.expiry_interval_secs.max(1))
    }

    pub fn metrics_interval(&self) -> Duration {
        Duration::from_secs(self.metrics_interval_secs.max(1))
    }
}

/// Background worker scheduler.
pub struct WorkerScheduler {
    config: WorkerConfig,
    service: Arc<DatasetService>,
}

impl WorkerScheduler {
    pub fn new(config: WorkerConfig, service: Arc<DatasetService>) -> Self {
        Self { config, service }
    }

    /// Starts all background workers. Returns no handles when disabled.
    pub fn start(self: Arc<Self>) -> Vec<JoinHandle<()>> {
        if !self.config.enabled {
            info!("Background workers disabled");
            return Vec::new();
        }

        let mut handles = Vec::new();

        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_expiry_worker().await;
        }));

        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_metrics_report().await;
        }));

        info!(
            expiry_interval_secs = self.config.expiry_interval_secs,
            "Background workers started"
        );
        handles
    }

    async fn run_expiry_worker(&self) {
        let worker = ExpiryWorker::new(self.service.clone());
        let mut ticker = interval(self.config.expiry_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if let Err(e) = worker.run().await {
                error!("Expiry sweep error: {}", e);
            }
        }
    }

    async fn run_metrics_report(&self) {
        let mut ticker = interval(self.config.metrics_interval());

        loop {
            ticker.tick().await;

            let snapshot = metrics().snapshot();
            info!(
                datasets_created = snapshot.datasets_created,
                lifecycle_transitions = snapshot.lifecycle_transitions,
                storage_events = snapshot.storage_events,
                command_failures = snapshot.command_failures,
                cas_retries = snapshot.cas_retries,
                corrupt_records = snapshot.corrupt_records,
                portal_failures = snapshot.portal_failures,
                datasets_expired = snapshot.datasets_expired,
                sweeps = snapshot.sweeps,
                "Metrics report"
            );
        }
    }
}
