//! SQLite schema.
//!
//! Documents are stored as JSON bodies; only the columns needed for
//! lookups and check-and-set are broken out.

/// Bumped whenever a table definition changes.
pub const SCHEMA_VERSION: i64 = 1;

pub const CREATE_META_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS store_meta (
    version INTEGER NOT NULL
);
"#;

/// One row per dataset, keyed by EPN.
///
/// `policy_beamline` mirrors the policy snapshot so policy deletion can
/// check for references without decoding bodies.
pub const CREATE_DATASETS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS datasets (
    epn TEXT PRIMARY KEY NOT NULL,
    policy_beamline TEXT NOT NULL,
    version INTEGER NOT NULL,
    body TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS datasets_policy_beamline ON datasets (policy_beamline);
"#;

/// One row per beamline policy.
pub const CREATE_POLICIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS policies (
    beamline TEXT PRIMARY KEY NOT NULL,
    body TEXT NOT NULL
);
"#;

/// All DDL in creation order.
pub fn all_tables() -> &'static [&'static str] {
    &[CREATE_DATASETS_TABLE, CREATE_POLICIES_TABLE]
}
