//! Dataset and policy stores for the retention service.

pub mod config;
pub mod error;
pub mod memory;
pub mod schema;
pub mod sqlite;


use std::sync::Arc;

use retention_core::{DatasetStore, PolicyStore, Result};

pub use config::{StoreBackend, StoreConfig};
pub use error::StoreError;
pub use memory::{MemoryDatasetStore, MemoryPolicyStore};
pub use sqlite::SqliteStore;

/// The pair of stores the service runs on.
#[derive(Clone)]
pub struct Stores {
    pub datasets: Arc<dyn DatasetStore>,
    pub policies: Arc<dyn PolicyStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            datasets: Arc::new(MemoryDatasetStore::new()),
            policies: Arc::new(MemoryPolicyStore::new()),
        }
    }
}

/// Opens the stores selected by `config.backend`.
pub fn open(config: &StoreConfig) -> Result<Stores> {
    match config.backend {
        StoreBackend::Memory => Ok(Stores::in_memory()),
        StoreBackend::Sqlite => {
            let store = Arc::new(SqliteStore::open(config)?);
            Ok(Stores {
                datasets: store.clone(),
                policies: store,
            })
        }
    }
}
