//! Storage item histories and their aggregation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observation of a storage item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEvent {
    pub created_at: DateTime<Utc>,
    pub host: String,
    pub path: String,
    /// Size in bytes, unset when unknown
    pub size: Option<u64>,
    /// Number of files, unset when unknown
    pub count: Option<u64>,
    /// Empty when the observation succeeded
    #[serde(default)]
    pub error: String,
}

impl StorageEvent {
    /// Whether this observation shows the item as usable.
    pub fn is_available(&self) -> bool {
        self.size.is_some() && self.count.is_some() && self.error.is_empty()
    }
}

/// Storage items by name, each with its history oldest-first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, Vec<StorageEvent>>", into = "BTreeMap<String, Vec<StorageEvent>>")]
pub struct StorageMap {
    items: BTreeMap<String, Vec<StorageEvent>>,
}

impl StorageMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(&mut self, item: &str, event: StorageEvent) {
        self.items.entry(item.to_string()).or_default().push(event);
    }

    /// Full history of one item.
    pub fn history(&self, item: &str) -> Option<&[StorageEvent]> {
        self.items.get(item).map(Vec::as_slice)
    }

    /// Most recent event of every item.
    pub fn latest(&self) -> impl Iterator<Item = (&str, &StorageEvent)> {
        self.items
            .iter()
            .filter_map(|(name, events)| events.last().map(|e| (name.as_str(), e)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[StorageEvent])> {
        self.items
            .iter()
            .map(|(name, events)| (name.as_str(), events.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl TryFrom<BTreeMap<String, Vec<StorageEvent>>> for StorageMap {
    type Error = String;

    fn try_from(items: BTreeMap<String, Vec<StorageEvent>>) -> Result<Self, Self::Error> {
        if let Some((name, _)) = items.iter().find(|(_, events)| events.is_empty()) {
            return Err(format!("storage item '{}' has no events", name));
        }
        Ok(Self { items })
    }
}

impl From<StorageMap> for BTreeMap<String, Vec<StorageEvent>> {
    fn from(map: StorageMap) -> Self {
        map.items
    }
}

/// Latest state of one storage item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSummary {
    pub name: String,
    pub available: bool,
    pub size: Option<u64>,
    pub count: Option<u64>,
}

/// Dataset-level storage usage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSummary {
    /// True iff at least one item exists and all items are available
    pub available: bool,
    pub total_size: u64,
    pub total_count: u64,
    pub items: Vec<ItemSummary>,
}

/// Folds the latest event of every item into a summary.
pub fn summarize(storage: &StorageMap) -> StorageSummary {
    let items: Vec<ItemSummary> = storage
        .latest()
        .map(|(name, event)| ItemSummary {
            name: name.to_string(),
            available: event.is_available(),
            size: event.size,
            count: event.count,
        })
        .collect();

    let available = !items.is_empty() && items.iter().all(|i| i.available);
    let total_size = items
        .iter()
        .fold(0u64, |acc, i| acc.saturating_add(i.size.unwrap_or(0)));
    let total_count = items
        .iter()
        .fold(0u64, |acc, i| acc.saturating_add(i.count.unwrap_or(0)));

    StorageSummary {
        available,
        total_size,
        total_count,
        items,
    }
}
