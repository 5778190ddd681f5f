//! Dataset and policy application service.
//!
//! Orchestrates the portal, the stores and the dataset aggregate. Handlers
//! and the expiry worker call into [`DatasetService`]; it owns no transport
//! concerns.

mod datasets;
mod policies;
mod service;


pub use datasets::MAX_CAS_ATTEMPTS;
pub use service::DatasetService;
