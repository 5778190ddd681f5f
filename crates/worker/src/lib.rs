//! Background workers for the retention service.
//!
//! - Expiry sweep (periodic lifecycle expiry check over all datasets)
//! - Metrics report (periodic metrics snapshot in the log)

pub mod expiry;
pub mod scheduler;

pub use expiry::{ExpiryWorker, SweepReport};
pub use scheduler::*;
