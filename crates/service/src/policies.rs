//! Retention policy administration.

use retention_core::{Entity, Error, Policy, PolicyUpdate, Result};
use tracing::info;

use crate::service::DatasetService;

impl DatasetService {
    pub async fn create_policy(&self, policy: Policy) -> Result<Policy> {
        self.policies
            .insert(&policy)
            .await
            .inspect_err(|e| self.record_failure("create-policy", &policy.beamline, e))?;

        info!(
            beamline = %policy.beamline,
            retention = policy.retention,
            quota = policy.quota,
            "Created policy"
        );
        Ok(policy)
    }

    pub async fn get_policy(&self, beamline: &str) -> Result<Policy> {
        self.policies
            .get(beamline)
            .await?
            .ok_or_else(|| Error::not_found(Entity::Policy, beamline))
    }

    pub async fn list_policies(&self) -> Result<Vec<Policy>> {
        self.policies.list().await
    }

    /// Applies the supplied fields. Datasets keep their snapshot of the
    /// previous values.
    pub async fn update_policy(&self, beamline: &str, update: PolicyUpdate) -> Result<Policy> {
        let result = async {
            let mut policy = self.get_policy(beamline).await?;
            policy.apply(update);
            self.policies.update(&policy).await?;
            Ok(policy)
        }
        .await;

        match &result {
            Ok(policy) => info!(
                beamline = %beamline,
                retention = policy.retention,
                quota = policy.quota,
                "Updated policy"
            ),
            Err(e) => self.record_failure("update-policy", beamline, e),
        }
        result
    }

    /// Deletes a policy no dataset refers to. Creation and visit refresh
    /// are held off between the reference count and the delete.
    pub async fn delete_policy(&self, beamline: &str) -> Result<()> {
        let result = async {
            let _refs = self.policy_refs.write().await;
            let datasets = self.datasets.count_by_beamline(beamline).await?;
            if datasets > 0 {
                return Err(Error::ReferentialConflict {
                    beamline: beamline.to_string(),
                    datasets,
                });
            }
            if !self.policies.delete(beamline).await? {
                return Err(Error::not_found(Entity::Policy, beamline));
            }
            Ok(())
        }
        .await;

        match &result {
            Ok(()) => info!(beamline = %beamline, "Deleted policy"),
            Err(e) => self.record_failure("delete-policy", beamline, e),
        }
        result
    }
}
