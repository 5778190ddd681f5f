//! Unified error types for the retention service.
//!
//! Every variant maps to a stable code string and an HTTP status so the
//! API layer can render it without inspecting messages:
//! - NOT_FOUND / ALREADY_EXISTS: identity errors
//! - POLICY_MISSING / REFERENTIAL_CONFLICT: policy errors
//! - INVALID_TRANSITION: lifecycle guard violations
//! - PORTAL_ERROR: visit provider failures
//! - CORRUPT_RECORD / STORE_ERROR / CONCURRENT_MODIFICATION: persistence errors

use std::fmt;

use thiserror::Error;

use crate::lifecycle::{LifecycleCommand, StateType};

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Kind of record an identity error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Dataset,
    Policy,
    Visit,
}

impl Entity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dataset => "dataset",
            Self::Policy => "policy",
            Self::Visit => "visit",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure category reported by a visit provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalErrorKind {
    /// The portal rejected our client credentials.
    AuthenticationFailed,
    /// The portal could not be reached or answered with an error.
    RequestFailed,
    /// The portal has no visit for the requested EPN.
    UnknownVisit,
}

impl PortalErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication failed",
            Self::RequestFailed => "request failed",
            Self::UnknownVisit => "unknown visit",
        }
    }
}

impl fmt::Display for PortalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for the retention service.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{entity} {key} does not exist")]
    NotFound { entity: Entity, key: String },

    #[error("{entity} {key} already exists")]
    AlreadyExists { entity: Entity, key: String },

    #[error("a policy for the {beamline} beamline does not exist")]
    PolicyMissing { beamline: String },

    #[error("cannot {command} dataset {epn} while it is in the {current} state")]
    InvalidTransition {
        epn: String,
        command: LifecycleCommand,
        current: StateType,
    },

    #[error("user portal {kind}: {message}")]
    Portal {
        kind: PortalErrorKind,
        message: String,
    },

    #[error("policy for {beamline} is still referenced by {datasets} dataset(s)")]
    ReferentialConflict { beamline: String, datasets: usize },

    #[error("record {key} seems to be damaged: {reason}")]
    CorruptRecord { key: String, reason: String },

    #[error("dataset {epn} was modified concurrently")]
    ConcurrentModification { epn: String },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store error: {0}")]
    Store(String),
}

impl Error {
    pub fn not_found(entity: Entity, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    pub fn already_exists(entity: Entity, key: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity,
            key: key.into(),
        }
    }

    pub fn policy_missing(beamline: impl Into<String>) -> Self {
        Self::PolicyMissing {
            beamline: beamline.into(),
        }
    }

    pub fn portal(kind: PortalErrorKind, msg: impl Into<String>) -> Self {
        Self::Portal {
            kind,
            message: msg.into(),
        }
    }

    pub fn corrupt(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CorruptRecord {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Get the stable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::AlreadyExists { .. } => "ALREADY_EXISTS",
            Self::PolicyMissing { .. } => "POLICY_MISSING",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::Portal { .. } => "PORTAL_ERROR",
            Self::ReferentialConflict { .. } => "REFERENTIAL_CONFLICT",
            Self::CorruptRecord { .. } => "CORRUPT_RECORD",
            Self::ConcurrentModification { .. } => "CONCURRENT_MODIFICATION",
            Self::Validation(_) | Self::Serialization(_) => "VALIDATION",
            Self::Store(_) => "STORE_ERROR",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::AlreadyExists { .. } => 409,
            Self::PolicyMissing { .. } => 422,
            Self::InvalidTransition { .. } => 409,
            // Portal failures are for the caller to retry or correct.
            Self::Portal { .. } => 400,
            Self::ReferentialConflict { .. } => 409,
            Self::CorruptRecord { .. } => 500,
            Self::ConcurrentModification { .. } => 409,
            Self::Validation(_) => 400,
            Self::Serialization(_) => 400,
            Self::Store(_) => 500,
        }
    }

    /// Whether the error was caused by the request rather than the service.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.http_status())
    }
}
