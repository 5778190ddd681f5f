//! Dataset commands and queries.
//!
//! Every mutating command follows load -> validate -> save with a
//! check-and-set on the loaded version, retried a bounded number of times
//! when another writer got there first.

use chrono::{DateTime, Utc};
use retention_core::{
    check_epn, Actor, Dataset, DatasetFilter, Entity, Error, ExpiryCheck, ExpiryOverride,
    LifecycleCommand, LifecycleLog, LifecycleState, Result, StorageEvent, StorageMap, Versioned,
};
use telemetry::metrics;
use tracing::{debug, info, warn};

use crate::service::DatasetService;

/// Attempts per command before a concurrent modification is surfaced.
pub const MAX_CAS_ATTEMPTS: usize = 3;

impl DatasetService {
    /// Creates a dataset for `epn` from its portal visit and beamline policy.
    pub async fn create_dataset(&self, epn: &str) -> Result<Dataset> {
        self.create_inner(epn)
            .await
            .inspect_err(|e| self.record_failure("create", epn, e))
    }

    async fn create_inner(&self, epn: &str) -> Result<Dataset> {
        check_epn(epn)?;
        if self.datasets.load(epn).await?.is_some() {
            return Err(Error::already_exists(Entity::Dataset, epn));
        }

        let visit = self.visits.resolve(epn).await?;

        let _refs = self.policy_refs.read().await;
        let policy = self.policies.get(&visit.beamline).await?;
        let dataset = Dataset::create(epn, visit, policy, self.clock.now())?;

        self.datasets.insert(&dataset).await?;

        metrics().datasets_created.inc();
        info!(
            epn = %epn,
            beamline = %dataset.beamline(),
            excluded = dataset.is_excluded(),
            "Created dataset"
        );
        Ok(dataset)
    }

    pub async fn get_dataset(&self, epn: &str) -> Result<Dataset> {
        Ok(self.load(epn).await?.value)
    }

    /// Datasets matching every set criterion, ordered by EPN.
    pub async fn search_datasets(&self, filter: &DatasetFilter) -> Result<Vec<Dataset>> {
        let mut found: Vec<Dataset> = self
            .datasets
            .list()
            .await?
            .into_iter()
            .filter(|d| filter.matches(d))
            .collect();
        found.sort_by(|a, b| a.epn().cmp(b.epn()));
        debug!(matches = found.len(), "Dataset search");
        Ok(found)
    }

    /// Removes the dataset record entirely.
    pub async fn delete_dataset(&self, epn: &str) -> Result<()> {
        if !self.datasets.delete(epn).await? {
            let err = Error::not_found(Entity::Dataset, epn);
            self.record_failure("delete-dataset", epn, &err);
            return Err(err);
        }
        metrics().datasets_deleted.inc();
        info!(epn = %epn, "Deleted dataset");
        Ok(())
    }

    /// Re-reads the visit from the portal and re-syncs the policy snapshot.
    pub async fn refresh_visit(&self, epn: &str) -> Result<Dataset> {
        let result = async {
            // Fail fast on unknown datasets before calling the portal.
            self.load(epn).await?;

            let visit = self.visits.resolve(epn).await?;

            let _refs = self.policy_refs.read().await;
            let policy = self.policies.get(&visit.beamline).await?;
            if policy.is_none() {
                warn!(
                    epn = %epn,
                    beamline = %visit.beamline,
                    "No policy for refreshed beamline, keeping snapshot"
                );
            }

            self.modify(epn, |ds, _| {
                let next = ds.refresh_visit(visit.clone(), policy.clone());
                Ok((Some(next.clone()), next))
            })
            .await
        }
        .await;

        result.inspect_err(|e| self.record_failure("refresh-visit", epn, e))
    }

    /// Appends an observation to a storage item.
    pub async fn add_storage_event(
        &self,
        epn: &str,
        item: &str,
        event: StorageEvent,
    ) -> Result<StorageEvent> {
        let result = self
            .modify(epn, |ds, _| {
                let next = ds.add_storage_event(item, event.clone());
                Ok((Some(next), event.clone()))
            })
            .await;

        match &result {
            Ok(_) => {
                metrics().storage_events.inc();
                debug!(epn = %epn, item = %item, "Recorded storage event");
            }
            Err(e) => self.record_failure("add-storage-event", epn, e),
        }
        result
    }

    pub async fn storage_history(&self, epn: &str) -> Result<StorageMap> {
        Ok(self.get_dataset(epn).await?.storage().clone())
    }

    /// Latest event of every storage item.
    pub async fn storage_latest(&self, epn: &str) -> Result<Vec<(String, StorageEvent)>> {
        let dataset = self.get_dataset(epn).await?;
        Ok(dataset
            .storage()
            .latest()
            .map(|(name, event)| (name.to_string(), event.clone()))
            .collect())
    }

    /// Renews the dataset; the new entry's expiry stacks on the current one.
    pub async fn renew_lifecycle(
        &self,
        epn: &str,
        actor: Actor,
        overrides: ExpiryOverride,
    ) -> Result<LifecycleState> {
        self.transition(epn, LifecycleCommand::Renew, |ds, now| {
            ds.renew(actor.clone(), overrides, now)
        })
        .await
    }

    /// Drops the dataset, or marks it deleted when `removed` is set.
    pub async fn drop_or_delete_lifecycle(
        &self,
        epn: &str,
        removed: bool,
        actor: Actor,
    ) -> Result<LifecycleState> {
        if removed {
            self.transition(epn, LifecycleCommand::Delete, |ds, now| {
                ds.mark_deleted(actor.clone(), now)
            })
            .await
        } else {
            self.transition(epn, LifecycleCommand::Drop, |ds, now| {
                ds.drop_data(actor.clone(), now)
            })
            .await
        }
    }

    /// Moves the dataset to EXPIRED if its expiry has passed. Idempotent.
    pub async fn check_expiry(&self, epn: &str) -> Result<ExpiryCheck> {
        let result = self
            .modify(epn, |ds, now| {
                let check = ds.check_expiry(now)?;
                let next = check.changed.then(|| check.dataset.clone());
                Ok((next, check))
            })
            .await;

        metrics().expiry_checks.inc();
        match &result {
            Ok(check) if check.changed => {
                metrics().datasets_expired.inc();
                info!(
                    epn = %epn,
                    expires_on = ?check.state().expires_on,
                    "Dataset expired"
                );
            }
            Ok(_) => {}
            Err(e) => self.record_failure("check-expiry", epn, e),
        }
        result
    }

    pub async fn lifecycle_history(&self, epn: &str) -> Result<LifecycleLog> {
        Ok(self.get_dataset(epn).await?.lifecycle().clone())
    }

    pub async fn lifecycle_latest(&self, epn: &str) -> Result<LifecycleState> {
        Ok(self.get_dataset(epn).await?.current_state().clone())
    }

    /// All EPNs, for the expiry sweep.
    pub async fn epns(&self) -> Result<Vec<String>> {
        self.datasets.epns().await
    }

    async fn transition<F>(
        &self,
        epn: &str,
        command: LifecycleCommand,
        apply: F,
    ) -> Result<LifecycleState>
    where
        F: Fn(&Dataset, DateTime<Utc>) -> Result<(Dataset, LifecycleState)> + Send + Sync,
    {
        let result = self
            .modify(epn, |ds, now| {
                let (next, entry) = apply(ds, now)?;
                Ok((Some(next), entry))
            })
            .await;

        match &result {
            Ok(entry) => {
                metrics().lifecycle_transitions.inc();
                info!(
                    epn = %epn,
                    command = %command,
                    state = %entry.state,
                    user_id = entry.user_id.as_deref().unwrap_or(""),
                    "Lifecycle transition"
                );
            }
            Err(e) => self.record_failure(command.as_str(), epn, e),
        }
        result
    }

    /// Load, apply, and check-and-set save. `apply` returns the snapshot to
    /// persist (none to skip the write) and the caller's result.
    async fn modify<T, F>(&self, epn: &str, mut apply: F) -> Result<T>
    where
        F: FnMut(&Dataset, DateTime<Utc>) -> Result<(Option<Dataset>, T)> + Send,
        T: Send,
    {
        let mut attempt = 1;
        loop {
            let Versioned { value, version } = self.load(epn).await?;
            let (next, out) = apply(&value, self.clock.now())?;

            let Some(next) = next else {
                return Ok(out);
            };

            match self.datasets.save(&next, version).await {
                Ok(_) => return Ok(out),
                Err(Error::ConcurrentModification { .. }) if attempt < MAX_CAS_ATTEMPTS => {
                    attempt += 1;
                    metrics().cas_retries.inc();
                    debug!(epn = %epn, attempt, "Concurrent modification, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub(crate) async fn load(&self, epn: &str) -> Result<Versioned<Dataset>> {
        self.datasets
            .load(epn)
            .await?
            .ok_or_else(|| Error::not_found(Entity::Dataset, epn))
    }
}
