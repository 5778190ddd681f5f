//! Per-beamline retention policy.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Retention policy for one beamline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Document id
    pub id: Uuid,
    /// Beamline the policy applies to (unique)
    pub beamline: String,
    /// Default retention in days
    pub retention: u32,
    /// Storage budget (advisory, not enforced)
    pub quota: u64,
    /// Experiment type ids exempt from expiry
    #[serde(default)]
    pub exclude_type: BTreeSet<i64>,
    /// Organisation ids exempt from expiry
    #[serde(default)]
    pub exclude_org: BTreeSet<i64>,
    #[serde(default)]
    pub notes: String,
}

impl Policy {
    /// Creates a policy without exclusions.
    pub fn new(beamline: impl Into<String>, retention: u32, quota: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            beamline: beamline.into(),
            retention,
            quota,
            exclude_type: BTreeSet::new(),
            exclude_org: BTreeSet::new(),
            notes: String::new(),
        }
    }

    pub fn with_excluded_types(mut self, types: impl IntoIterator<Item = i64>) -> Self {
        self.exclude_type.extend(types);
        self
    }

    pub fn with_excluded_orgs(mut self, orgs: impl IntoIterator<Item = i64>) -> Self {
        self.exclude_org.extend(orgs);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Applies a partial update; absent fields are left unchanged.
    pub fn apply(&mut self, update: PolicyUpdate) {
        if let Some(retention) = update.retention {
            self.retention = retention;
        }
        if let Some(quota) = update.quota {
            self.quota = quota;
        }
        if let Some(types) = update.exclude_type {
            self.exclude_type = types;
        }
        if let Some(orgs) = update.exclude_org {
            self.exclude_org = orgs;
        }
        if let Some(notes) = update.notes {
            self.notes = notes;
        }
    }
}

/// Partial policy update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyUpdate {
    pub retention: Option<u32>,
    pub quota: Option<u64>,
    pub exclude_type: Option<BTreeSet<i64>>,
    pub exclude_org: Option<BTreeSet<i64>>,
    pub notes: Option<String>,
}
