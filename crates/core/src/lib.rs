//! Core types, lifecycle rules, and validation for the dataset retention service.

pub mod clock;
pub mod dataset;
pub mod error;
pub mod exclusion;
pub mod expiry;
pub mod interfaces;
pub mod lifecycle;
pub mod limits;
pub mod policy;
pub mod requests;
pub mod search;
pub mod storage;
pub mod view;
pub mod visit;

pub use clock::{Clock, LocalZone, ManualClock, SystemClock};
pub use dataset::{Dataset, ExpiryCheck};
pub use error::{Entity, Error, PortalErrorKind, Result};
pub use exclusion::is_excluded;
pub use expiry::{compute_expiry, initial_expiry, ExpiryOverride};
pub use interfaces::{DatasetStore, PolicyStore, Versioned, VisitProvider};
pub use lifecycle::{Actor, LifecycleCommand, LifecycleLog, LifecycleState, StateType};
pub use policy::{Policy, PolicyUpdate};
pub use requests::*;
pub use search::DatasetFilter;
pub use storage::{summarize, ItemSummary, StorageEvent, StorageMap, StorageSummary};
pub use view::*;
pub use visit::{Organisation, PrincipalInvestigator, Visit, VisitType};
