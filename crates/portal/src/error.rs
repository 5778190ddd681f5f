//! Portal client errors.

use retention_core::{Error, PortalErrorKind};
use thiserror::Error as ThisError;

#[derive(Debug, Clone, ThisError)]
pub enum PortalError {
    #[error("login rejected: {0}")]
    Authentication(String),

    #[error("{0}")]
    Request(String),

    #[error("no visit for EPN {0}")]
    UnknownVisit(String),

    #[error("invalid portal configuration: {0}")]
    Config(String),
}

impl PortalError {
    pub fn kind(&self) -> PortalErrorKind {
        match self {
            Self::Authentication(_) => PortalErrorKind::AuthenticationFailed,
            Self::UnknownVisit(_) => PortalErrorKind::UnknownVisit,
            Self::Request(_) | Self::Config(_) => PortalErrorKind::RequestFailed,
        }
    }

    /// Failures that say nothing about the portal's availability.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::UnknownVisit(_))
    }
}

impl From<reqwest::Error> for PortalError {
    fn from(err: reqwest::Error) -> Self {
        Self::Request(err.to_string())
    }
}

impl From<PortalError> for Error {
    fn from(err: PortalError) -> Self {
        Error::portal(err.kind(), err.to_string())
    }
}
