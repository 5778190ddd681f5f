//! Collaborator traits: dataset persistence, policy lookup and the visit
//! provider. Implementations live in `dataset-store` and `portal-client`.

use async_trait::async_trait;

use crate::dataset::Dataset;
use crate::error::Result;
use crate::policy::Policy;
use crate::visit::Visit;

/// A dataset together with the store version it was loaded at.
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    pub value: T,
    pub version: u64,
}

/// Dataset persistence keyed by EPN.
///
/// Saves are check-and-set: `save` fails with `ConcurrentModification`
/// when the stored version no longer equals `expected_version`.
#[async_trait]
pub trait DatasetStore: Send + Sync {
    /// Inserts a new dataset at version 1. Fails with `AlreadyExists` for a
    /// taken EPN.
    async fn insert(&self, dataset: &Dataset) -> Result<u64>;

    async fn load(&self, epn: &str) -> Result<Option<Versioned<Dataset>>>;

    /// Replaces a dataset, returning the new version.
    async fn save(&self, dataset: &Dataset, expected_version: u64) -> Result<u64>;

    /// Removes a dataset. Returns false when it did not exist.
    async fn delete(&self, epn: &str) -> Result<bool>;

    /// All readable datasets, ordered by EPN. Damaged records are skipped.
    async fn list(&self) -> Result<Vec<Dataset>>;

    /// Number of datasets whose policy snapshot names `beamline`.
    async fn count_by_beamline(&self, beamline: &str) -> Result<usize>;

    /// All EPNs, ordered.
    async fn epns(&self) -> Result<Vec<String>>;

    async fn ping(&self) -> Result<()>;
}

/// Policy persistence keyed by beamline.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Fails with `AlreadyExists` for a taken beamline.
    async fn insert(&self, policy: &Policy) -> Result<()>;

    async fn get(&self, beamline: &str) -> Result<Option<Policy>>;

    /// Replaces an existing policy. Fails with `NotFound` when absent.
    async fn update(&self, policy: &Policy) -> Result<()>;

    /// Returns false when no policy existed.
    async fn delete(&self, beamline: &str) -> Result<bool>;

    async fn list(&self) -> Result<Vec<Policy>>;

    async fn ping(&self) -> Result<()>;
}

/// Resolves experiment metadata from the user portal.
#[async_trait]
pub trait VisitProvider: Send + Sync {
    /// Fails with `Error::Portal` when the portal cannot be reached,
    /// rejects the credentials, or does not know the EPN.
    async fn resolve(&self, epn: &str) -> Result<Visit>;
}
