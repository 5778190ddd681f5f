//! In-memory stores for development and tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use retention_core::{
    Dataset, DatasetStore, Entity, Error, Policy, PolicyStore, Result, Versioned,
};
use tracing::debug;

#[derive(Debug, Clone)]
struct Entry {
    dataset: Dataset,
    version: u64,
}

/// Datasets keyed by EPN behind a single lock.
#[derive(Debug, Default)]
pub struct MemoryDatasetStore {
    datasets: RwLock<BTreeMap<String, Entry>>,
}

impl MemoryDatasetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DatasetStore for MemoryDatasetStore {
    async fn insert(&self, dataset: &Dataset) -> Result<u64> {
        let mut datasets = self.datasets.write();
        if datasets.contains_key(dataset.epn()) {
            return Err(Error::already_exists(Entity::Dataset, dataset.epn()));
        }
        datasets.insert(
            dataset.epn().to_string(),
            Entry {
                dataset: dataset.clone(),
                version: 1,
            },
        );
        Ok(1)
    }

    async fn load(&self, epn: &str) -> Result<Option<Versioned<Dataset>>> {
        Ok(self.datasets.read().get(epn).map(|e| Versioned {
            value: e.dataset.clone(),
            version: e.version,
        }))
    }

    async fn save(&self, dataset: &Dataset, expected_version: u64) -> Result<u64> {
        let mut datasets = self.datasets.write();
        let entry = datasets
            .get_mut(dataset.epn())
            .ok_or_else(|| Error::not_found(Entity::Dataset, dataset.epn()))?;

        if entry.version != expected_version {
            debug!(
                epn = %dataset.epn(),
                expected = expected_version,
                actual = entry.version,
                "Version mismatch on save"
            );
            return Err(Error::ConcurrentModification {
                epn: dataset.epn().to_string(),
            });
        }

        entry.dataset = dataset.clone();
        entry.version += 1;
        Ok(entry.version)
    }

    async fn delete(&self, epn: &str) -> Result<bool> {
        Ok(self.datasets.write().remove(epn).is_some())
    }

    async fn list(&self) -> Result<Vec<Dataset>> {
        Ok(self
            .datasets
            .read()
            .values()
            .map(|e| e.dataset.clone())
            .collect())
    }

    async fn count_by_beamline(&self, beamline: &str) -> Result<usize> {
        Ok(self
            .datasets
            .read()
            .values()
            .filter(|e| e.dataset.policy().beamline == beamline)
            .count())
    }

    async fn epns(&self) -> Result<Vec<String>> {
        Ok(self.datasets.read().keys().cloned().collect())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Policies keyed by beamline.
#[derive(Debug, Default)]
pub struct MemoryPolicyStore {
    policies: RwLock<BTreeMap<String, Policy>>,
}

impl MemoryPolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store, replacing any existing policy for the same beamline.
    pub fn with_policies(policies: impl IntoIterator<Item = Policy>) -> Self {
        let store = Self::new();
        {
            let mut map = store.policies.write();
            for policy in policies {
                map.insert(policy.beamline.clone(), policy);
            }
        }
        store
    }
}

#[async_trait]
impl PolicyStore for MemoryPolicyStore {
    async fn insert(&self, policy: &Policy) -> Result<()> {
        let mut policies = self.policies.write();
        if policies.contains_key(&policy.beamline) {
            return Err(Error::already_exists(Entity::Policy, &policy.beamline));
        }
        policies.insert(policy.beamline.clone(), policy.clone());
        Ok(())
    }

    async fn get(&self, beamline: &str) -> Result<Option<Policy>> {
        Ok(self.policies.read().get(beamline).cloned())
    }

    async fn update(&self, policy: &Policy) -> Result<()> {
        let mut policies = self.policies.write();
        match policies.get_mut(&policy.beamline) {
            Some(existing) => {
                *existing = policy.clone();
                Ok(())
            }
            None => Err(Error::not_found(Entity::Policy, &policy.beamline)),
        }
    }

    async fn delete(&self, beamline: &str) -> Result<bool> {
        Ok(self.policies.write().remove(beamline).is_some())
    }

    async fn list(&self) -> Result<Vec<Policy>> {
        Ok(self.policies.read().values().cloned().collect())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
