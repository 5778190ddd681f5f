//! Field limits and fixed formats for request validation.
//!
//! The `#[validate]` derive macro requires literal values in attributes,
//! so length limits are duplicated in `requests.rs`. Tests there check
//! each constant against its validator.

// === Identifiers ===

/// EPN max length.
pub const MAX_EPN_LEN: usize = 64;

/// EPN pattern: alphanumeric start, then alphanumerics, `_` or `-`.
pub const EPN_PATTERN: &str = r"^[A-Za-z0-9][A-Za-z0-9_\-]{0,63}$";

/// Beamline name max length.
pub const MAX_BEAMLINE_LEN: usize = 64;

/// Storage item name max length ("raw", "processed", ...).
pub const MAX_ITEM_NAME_LEN: usize = 64;

// === Free text ===

/// Notes max length (dataset, policy and lifecycle notes).
pub const MAX_NOTES_LEN: usize = 4000;

/// User ID max length.
pub const MAX_USER_ID_LEN: usize = 128;

/// User display name max length.
pub const MAX_USER_NAME_LEN: usize = 200;

/// Storage host max length (DNS name limit).
pub const MAX_HOST_LEN: usize = 255;

/// Storage path max length.
pub const MAX_PATH_LEN: usize = 4096;

/// Storage error message max length.
pub const MAX_STORAGE_ERROR_LEN: usize = 4000;

// === Retention ===

/// Upper bound on policy retention and renewal day counts (100 years).
pub const MAX_RETENTION_DAYS: u32 = 36_500;

/// Naive local-time formats accepted for explicit expiry dates.
pub const EXPIRY_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Date-only expiry, read as local midnight.
pub const EXPIRY_DAY_FORMAT: &str = "%Y-%m-%d";

/// User name recorded on system-generated lifecycle entries.
pub const AUTO_USER_NAME: &str = "auto";
