//! Store-level errors.

use retention_core::Error;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("schema version {found} is not supported (expected {expected})")]
    SchemaVersion { found: i64, expected: i64 },
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        Error::store(err.to_string())
    }
}

/// Maps a rusqlite error straight into the core taxonomy.
pub(crate) fn db(err: rusqlite::Error) -> Error {
    StoreError::from(err).into()
}

/// Whether `err` is a UNIQUE / PRIMARY KEY violation.
pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
