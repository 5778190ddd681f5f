//! Dataset aggregate.
//!
//! A `Dataset` is an immutable snapshot: commands validate against it and
//! return a new snapshot for the store to persist. Nothing is appended
//! unless every guard passed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::exclusion::is_excluded;
use crate::expiry::{initial_expiry, ExpiryOverride};
use crate::lifecycle::{
    evaluate, Actor, LifecycleLog, LifecycleState, Outcome, StateType, Transition,
    TransitionContext,
};
use crate::policy::Policy;
use crate::storage::{summarize, StorageEvent, StorageMap, StorageSummary};
use crate::visit::Visit;

const CREATION_NOTES: &str = "auto generated during dataset creation";

/// An experiment dataset and its retention history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    id: Uuid,
    epn: String,
    #[serde(default)]
    notes: String,
    visit: Visit,
    /// Policy snapshot taken at creation or the last visit refresh
    policy: Policy,
    #[serde(default)]
    storage: StorageMap,
    lifecycle: LifecycleLog,
}

/// Result of an expiry check.
#[derive(Debug, Clone)]
pub struct ExpiryCheck {
    pub dataset: Dataset,
    pub changed: bool,
}

impl ExpiryCheck {
    pub fn state(&self) -> &LifecycleState {
        self.dataset.current_state()
    }
}

impl Dataset {
    /// Creates a dataset for a resolved visit.
    ///
    /// `policy` is the lookup result for the visit's beamline.
    pub fn create(
        epn: impl Into<String>,
        visit: Visit,
        policy: Option<Policy>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let policy = policy.ok_or_else(|| Error::policy_missing(&visit.beamline))?;
        let expires_on = initial_expiry(&visit, &policy);

        Ok(Self {
            id: Uuid::new_v4(),
            epn: epn.into(),
            notes: String::new(),
            visit,
            policy,
            storage: StorageMap::new(),
            lifecycle: LifecycleLog::new(LifecycleState::auto(
                StateType::Normal,
                now,
                expires_on,
                CREATION_NOTES,
            )),
        })
    }

    /// Decodes a persisted document, reporting any structural problem as
    /// a corrupt record.
    pub fn from_json(key: &str, json: &str) -> Result<Self> {
        let dataset: Self =
            serde_json::from_str(json).map_err(|e| Error::corrupt(key, e.to_string()))?;
        dataset.check_integrity()?;
        Ok(dataset)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Structural checks beyond what deserialization enforces.
    pub fn check_integrity(&self) -> Result<()> {
        if self.epn.trim().is_empty() {
            return Err(Error::corrupt(self.id.to_string(), "missing EPN"));
        }
        let first = &self.lifecycle.entries()[0];
        if first.state != StateType::Normal {
            return Err(Error::corrupt(
                &self.epn,
                format!("lifecycle starts in {} instead of NORMAL", first.state),
            ));
        }
        Ok(())
    }

    // === Queries ===

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn epn(&self) -> &str {
        &self.epn
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn visit(&self) -> &Visit {
        &self.visit
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn beamline(&self) -> &str {
        &self.visit.beamline
    }

    pub fn storage(&self) -> &StorageMap {
        &self.storage
    }

    pub fn lifecycle(&self) -> &LifecycleLog {
        &self.lifecycle
    }

    pub fn current_state(&self) -> &LifecycleState {
        self.lifecycle.current()
    }

    pub fn current_expiry(&self) -> Option<DateTime<Utc>> {
        self.current_state().expires_on
    }

    pub fn is_excluded(&self) -> bool {
        is_excluded(&self.visit, &self.policy)
    }

    pub fn storage_summary(&self) -> StorageSummary {
        summarize(&self.storage)
    }

    // === Commands ===

    /// Renews the dataset, returning the new snapshot and appended entry.
    pub fn renew(
        &self,
        actor: Actor,
        overrides: ExpiryOverride,
        now: DateTime<Utc>,
    ) -> Result<(Self, LifecycleState)> {
        self.apply_user_transition(Transition::Renew { actor, overrides }, now)
    }

    /// Marks the dataset's data for removal.
    pub fn drop_data(&self, actor: Actor, now: DateTime<Utc>) -> Result<(Self, LifecycleState)> {
        self.apply_user_transition(Transition::Drop { actor }, now)
    }

    /// Records that dropped data has been removed.
    pub fn mark_deleted(
        &self,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> Result<(Self, LifecycleState)> {
        self.apply_user_transition(Transition::Delete { actor }, now)
    }

    /// Moves the dataset to EXPIRED when its expiry has passed.
    pub fn check_expiry(&self, now: DateTime<Utc>) -> Result<ExpiryCheck> {
        match self.evaluate(&Transition::Expire, now)? {
            Outcome::Applied(entry) => {
                let mut dataset = self.clone();
                dataset.lifecycle.append(entry);
                Ok(ExpiryCheck {
                    dataset,
                    changed: true,
                })
            }
            Outcome::Unchanged => Ok(ExpiryCheck {
                dataset: self.clone(),
                changed: false,
            }),
        }
    }

    /// Replaces the visit; the policy snapshot follows the visit's beamline
    /// when a policy for it exists.
    pub fn refresh_visit(&self, visit: Visit, policy: Option<Policy>) -> Self {
        let mut dataset = self.clone();
        dataset.visit = visit;
        if let Some(policy) = policy {
            dataset.policy = policy;
        }
        dataset
    }

    /// Appends an observation to a storage item's history.
    pub fn add_storage_event(&self, item: &str, event: StorageEvent) -> Self {
        let mut dataset = self.clone();
        dataset.storage.append(item, event);
        dataset
    }

    fn evaluate(&self, transition: &Transition, now: DateTime<Utc>) -> Result<Outcome> {
        let ctx = TransitionContext {
            excluded: self.is_excluded(),
            retention_days: self.policy.retention,
            now,
        };
        evaluate(self.current_state(), transition, &ctx).map_err(|rejected| {
            Error::InvalidTransition {
                epn: self.epn.clone(),
                command: rejected.command,
                current: rejected.current,
            }
        })
    }

    fn apply_user_transition(
        &self,
        transition: Transition,
        now: DateTime<Utc>,
    ) -> Result<(Self, LifecycleState)> {
        match self.evaluate(&transition, now)? {
            Outcome::Applied(entry) => {
                let mut dataset = self.clone();
                dataset.lifecycle.append(entry.clone());
                Ok((dataset, entry))
            }
            Outcome::Unchanged => Err(Error::InvalidTransition {
                epn: self.epn.clone(),
                command: transition.command(),
                current: self.current_state().state,
            }),
        }
    }
}
