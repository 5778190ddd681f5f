//! Shared setup for the HTTP integration tests.

pub mod fixtures;
pub mod mocks;
