//! In-process counters for dataset commands and the expiry sweep.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// A gauge metric (last observed value).
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Duration histogram in milliseconds.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 10ms, 50ms, 100ms, 500ms, 1s, 5s, 10s, 30s, 60s, 300s, +inf
    buckets: [AtomicU64; 11],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 10] = [10, 50, 100, 500, 1_000, 5_000, 10_000, 30_000, 60_000, 300_000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        let idx = Self::BUCKET_BOUNDS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(Self::BUCKET_BOUNDS.len());
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }

    /// Bucket counts keyed by upper bound; `u64::MAX` is the overflow bucket.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .copied()
            .chain(std::iter::once(u64::MAX))
            .zip(self.buckets.iter())
            .map(|(bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct Metrics {
    // Dataset commands
    pub datasets_created: Counter,
    pub datasets_deleted: Counter,
    pub lifecycle_transitions: Counter,
    pub storage_events: Counter,
    pub command_failures: Counter,
    pub cas_retries: Counter,
    pub corrupt_records: Counter,

    // Portal
    pub portal_failures: Counter,

    // Expiry
    pub expiry_checks: Counter,
    pub datasets_expired: Counter,
    pub sweep_duration_ms: Histogram,
    pub last_sweep_datasets: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub datasets_created: u64,
    pub datasets_deleted: u64,
    pub lifecycle_transitions: u64,
    pub storage_events: u64,
    pub command_failures: u64,
    pub cas_retries: u64,
    pub corrupt_records: u64,
    pub portal_failures: u64,
    pub expiry_checks: u64,
    pub datasets_expired: u64,
    pub sweeps: u64,
    pub sweep_duration_mean_ms: f64,
    pub last_sweep_datasets: u64,
}

impl Metrics {
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            datasets_created: self.datasets_created.get(),
            datasets_deleted: self.datasets_deleted.get(),
            lifecycle_transitions: self.lifecycle_transitions.get(),
            storage_events: self.storage_events.get(),
            command_failures: self.command_failures.get(),
            cas_retries: self.cas_retries.get(),
            corrupt_records: self.corrupt_records.get(),
            portal_failures: self.portal_failures.get(),
            expiry_checks: self.expiry_checks.get(),
            datasets_expired: self.datasets_expired.get(),
            sweeps: self.sweep_duration_ms.count(),
            sweep_duration_mean_ms: self.sweep_duration_ms.mean(),
            last_sweep_datasets: self.last_sweep_datasets.get(),
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
