//! Response views rendered in the configured local zone.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::LocalZone;
use crate::dataset::{Dataset, ExpiryCheck};
use crate::lifecycle::{LifecycleLog, LifecycleState, StateType};
use crate::policy::Policy;
use crate::storage::{StorageEvent, StorageMap};
use crate::visit::{Organisation, VisitType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitSummaryView {
    pub id: i64,
    pub start: String,
    pub end: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiView {
    pub id: i64,
    pub first_names: String,
    pub last_name: String,
    pub email: String,
    pub org: Organisation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySummaryView {
    pub beamline: String,
    pub retention: u32,
    pub quota: u64,
}

/// Dataset detail and search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetView {
    pub epn: String,
    pub id: Uuid,
    pub beamline: String,
    pub status: StateType,
    pub excluded: bool,
    pub expires_on: Option<String>,
    pub available: bool,
    pub size: u64,
    pub count: u64,
    /// PI email
    pub contact: String,
    pub notes: String,
    pub visit: VisitSummaryView,
    #[serde(rename = "type")]
    pub visit_type: VisitType,
    pub pi: PiView,
    pub policy: PolicySummaryView,
}

impl DatasetView {
    pub fn render(dataset: &Dataset, zone: &LocalZone) -> Self {
        let visit = dataset.visit();
        let pi = &visit.pi;
        let policy = dataset.policy();
        let summary = dataset.storage_summary();

        Self {
            epn: dataset.epn().to_string(),
            id: dataset.id(),
            beamline: visit.beamline.clone(),
            status: dataset.current_state().state,
            excluded: dataset.is_excluded(),
            expires_on: zone.render_opt(dataset.current_expiry()),
            available: summary.available,
            size: summary.total_size,
            count: summary.total_count,
            contact: pi.email.clone(),
            notes: dataset.notes().to_string(),
            visit: VisitSummaryView {
                id: visit.id,
                start: zone.render(visit.start_date),
                end: zone.render(visit.end_date),
                title: visit.title.clone(),
            },
            visit_type: visit.visit_type.clone(),
            pi: PiView {
                id: pi.id,
                first_names: pi.first_names.clone(),
                last_name: pi.last_name.clone(),
                email: pi.email.clone(),
                org: pi.org.clone(),
            },
            policy: PolicySummaryView {
                beamline: policy.beamline.clone(),
                retention: policy.retention,
                quota: policy.quota,
            },
        }
    }
}

/// Search response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetListView {
    pub datasets: Vec<DatasetView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleStateView {
    #[serde(rename = "type")]
    pub state: StateType,
    pub created_at: String,
    pub expires_on: Option<String>,
    pub user_id: Option<String>,
    pub user_name: String,
    pub notes: String,
}

impl LifecycleStateView {
    pub fn render(state: &LifecycleState, zone: &LocalZone) -> Self {
        Self {
            state: state.state,
            created_at: zone.render(state.created_at),
            expires_on: zone.render_opt(state.expires_on),
            user_id: state.user_id.clone(),
            user_name: state.user_name.clone(),
            notes: state.notes.clone(),
        }
    }
}

/// Lifecycle history, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleHistoryView {
    pub epn: String,
    pub lifecycle: Vec<LifecycleStateView>,
}

impl LifecycleHistoryView {
    pub fn render(epn: &str, log: &LifecycleLog, zone: &LocalZone) -> Self {
        Self {
            epn: epn.to_string(),
            lifecycle: log
                .entries()
                .iter()
                .map(|s| LifecycleStateView::render(s, zone))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpiryCheckView {
    #[serde(flatten)]
    pub state: LifecycleStateView,
    pub changed: bool,
}

impl ExpiryCheckView {
    pub fn render(check: &ExpiryCheck, zone: &LocalZone) -> Self {
        Self {
            state: LifecycleStateView::render(check.state(), zone),
            changed: check.changed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageEventView {
    pub created_at: String,
    pub host: String,
    pub path: String,
    pub size: Option<u64>,
    pub count: Option<u64>,
    pub error: String,
}

impl StorageEventView {
    pub fn render(event: &StorageEvent, zone: &LocalZone) -> Self {
        Self {
            created_at: zone.render(event.created_at),
            host: event.host.clone(),
            path: event.path.clone(),
            size: event.size,
            count: event.count,
            error: event.error.clone(),
        }
    }
}

/// Full storage history keyed by item name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageHistoryView {
    pub epn: String,
    pub storage: BTreeMap<String, Vec<StorageEventView>>,
}

impl StorageHistoryView {
    pub fn render(epn: &str, storage: &StorageMap, zone: &LocalZone) -> Self {
        Self {
            epn: epn.to_string(),
            storage: storage
                .iter()
                .map(|(name, events)| {
                    let events = events
                        .iter()
                        .map(|e| StorageEventView::render(e, zone))
                        .collect();
                    (name.to_string(), events)
                })
                .collect(),
        }
    }
}

/// Latest event per storage item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageLatestView {
    pub epn: String,
    pub storage: BTreeMap<String, StorageEventView>,
}

impl StorageLatestView {
    pub fn render(epn: &str, latest: &[(String, StorageEvent)], zone: &LocalZone) -> Self {
        Self {
            epn: epn.to_string(),
            storage: latest
                .iter()
                .map(|(name, e)| (name.clone(), StorageEventView::render(e, zone)))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyView {
    pub id: Uuid,
    pub beamline: String,
    pub retention: u32,
    pub quota: u64,
    pub exclude_type: Vec<i64>,
    pub exclude_org: Vec<i64>,
    pub notes: String,
}

impl From<&Policy> for PolicyView {
    fn from(policy: &Policy) -> Self {
        Self {
            id: policy.id,
            beamline: policy.beamline.clone(),
            retention: policy.retention,
            quota: policy.quota,
            exclude_type: policy.exclude_type.iter().copied().collect(),
            exclude_org: policy.exclude_org.iter().copied().collect(),
            notes: policy.notes.clone(),
        }
    }
}

/// Acknowledgement for policy writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRef {
    pub beamline: String,
    pub id: Uuid,
}

impl From<&Policy> for PolicyRef {
    fn from(policy: &Policy) -> Self {
        Self {
            beamline: policy.beamline.clone(),
            id: policy.id,
        }
    }
}
