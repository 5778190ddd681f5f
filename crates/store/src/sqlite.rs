//! SQLite-backed dataset and policy stores.
//!
//! A single connection guarded by a mutex; every call runs on the blocking
//! pool so request handlers never block the runtime.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use retention_core::{
    Dataset, DatasetStore, Entity, Error, Policy, PolicyStore, Result, Versioned,
};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use telemetry::metrics;
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::error::{db, is_constraint_violation, StoreError};
use crate::schema::{all_tables, CREATE_META_TABLE, SCHEMA_VERSION};

/// Shared SQLite connection implementing both store traits.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `config.path`.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
        let conn = Connection::open_with_flags(Path::new(&config.path), flags).map_err(db)?;
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))
            .map_err(db)?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")
            .map_err(db)?;

        let mut conn = conn;
        initialize_schema(&mut conn)?;

        info!(path = %config.path, "Opened SQLite store");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `op` against the connection on the blocking pool.
    async fn blocking<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock();
            op(&mut guard)
        })
        .await
        .map_err(StoreError::from)?
    }
}

fn initialize_schema(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction().map_err(db)?;
    tx.execute_batch(CREATE_META_TABLE).map_err(db)?;

    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", [], |row| row.get(0))
        .optional()
        .map_err(db)?;

    match version {
        None => {
            tx.execute(
                "INSERT INTO store_meta (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )
            .map_err(db)?;
        }
        Some(v) if v == SCHEMA_VERSION => {}
        Some(found) => {
            return Err(StoreError::SchemaVersion {
                found,
                expected: SCHEMA_VERSION,
            }
            .into());
        }
    }

    for ddl in all_tables() {
        tx.execute_batch(ddl).map_err(db)?;
    }
    tx.commit().map_err(db)
}

fn to_version(epn: &str, raw: i64) -> Result<u64> {
    u64::try_from(raw).map_err(|_| Error::corrupt(epn, format!("negative version {}", raw)))
}

fn decode_policy(beamline: &str, body: &str) -> Result<Policy> {
    serde_json::from_str(body).map_err(|e| Error::corrupt(beamline, e.to_string()))
}

#[async_trait]
impl DatasetStore for SqliteStore {
    async fn insert(&self, dataset: &Dataset) -> Result<u64> {
        let epn = dataset.epn().to_string();
        let beamline = dataset.policy().beamline.clone();
        let body = dataset.to_json()?;

        self.blocking(move |conn| {
            let inserted = conn.execute(
                "INSERT INTO datasets (epn, policy_beamline, version, body, updated_at)
                 VALUES (?1, ?2, 1, ?3, ?4)",
                params![epn, beamline, body, Utc::now().to_rfc3339()],
            );
            match inserted {
                Ok(_) => Ok(1),
                Err(e) if is_constraint_violation(&e) => {
                    Err(Error::already_exists(Entity::Dataset, epn))
                }
                Err(e) => Err(db(e)),
            }
        })
        .await
    }

    async fn load(&self, epn: &str) -> Result<Option<Versioned<Dataset>>> {
        let epn = epn.to_string();
        self.blocking(move |conn| {
            let row: Option<(String, i64)> = conn
                .query_row(
                    "SELECT body, version FROM datasets WHERE epn = ?1",
                    params![epn],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()
                .map_err(db)?;

            row.map(|(body, version)| {
                Ok(Versioned {
                    value: Dataset::from_json(&epn, &body)?,
                    version: to_version(&epn, version)?,
                })
            })
            .transpose()
        })
        .await
    }

    async fn save(&self, dataset: &Dataset, expected_version: u64) -> Result<u64> {
        let epn = dataset.epn().to_string();
        let beamline = dataset.policy().beamline.clone();
        let body = dataset.to_json()?;
        let expected = i64::try_from(expected_version)
            .map_err(|_| Error::validation("version out of range"))?;

        self.blocking(move |conn| {
            let tx = conn.transaction().map_err(db)?;
            let updated = tx
                .execute(
                    "UPDATE datasets
                     SET body = ?1, policy_beamline = ?2, version = version + 1, updated_at = ?3
                     WHERE epn = ?4 AND version = ?5",
                    params![body, beamline, Utc::now().to_rfc3339(), epn, expected],
                )
                .map_err(db)?;

            if updated == 0 {
                let exists: Option<i64> = tx
                    .query_row(
                        "SELECT version FROM datasets WHERE epn = ?1",
                        params![epn],
                        |row| row.get(0),
                    )
                    .optional()
                    .map_err(db)?;
                return match exists {
                    None => Err(Error::not_found(Entity::Dataset, epn)),
                    Some(actual) => {
                        debug!(epn = %epn, expected, actual, "Version mismatch on save");
                        Err(Error::ConcurrentModification { epn })
                    }
                };
            }

            tx.commit().map_err(db)?;
            Ok(expected_version + 1)
        })
        .await
    }

    async fn delete(&self, epn: &str) -> Result<bool> {
        let epn = epn.to_string();
        self.blocking(move |conn| {
            let removed = conn
                .execute("DELETE FROM datasets WHERE epn = ?1", params![epn])
                .map_err(db)?;
            Ok(removed > 0)
        })
        .await
    }

    async fn list(&self) -> Result<Vec<Dataset>> {
        self.blocking(|conn| {
            let mut stmt = conn
                .prepare("SELECT epn, body FROM datasets ORDER BY epn")
                .map_err(db)?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
                .map_err(db)?;

            // A damaged row only hides itself; `load` still reports it.
            let mut datasets = Vec::new();
            for row in rows {
                let (epn, body) = row.map_err(db)?;
                match Dataset::from_json(&epn, &body) {
                    Ok(dataset) => datasets.push(dataset),
                    Err(e) => {
                        metrics().corrupt_records.inc();
                        warn!(epn = %epn, error = %e, "Skipping damaged dataset record");
                    }
                }
            }
            Ok(datasets)
        })
        .await
    }

    async fn count_by_beamline(&self, beamline: &str) -> Result<usize> {
        let beamline = beamline.to_string();
        self.blocking(move |conn| {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM datasets WHERE policy_beamline = ?1",
                    params![beamline],
                    |row| row.get(0),
                )
                .map_err(db)?;
            Ok(usize::try_from(count).unwrap_or(0))
        })
        .await
    }

    async fn epns(&self) -> Result<Vec<String>> {
        self.blocking(|conn| {
            let mut stmt = conn
                .prepare("SELECT epn FROM datasets ORDER BY epn")
                .map_err(db)?;
            let epns = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(db)?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(db)?;
            Ok(epns)
        })
        .await
    }

    async fn ping(&self) -> Result<()> {
        self.blocking(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map_err(db)?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl PolicyStore for SqliteStore {
    async fn insert(&self, policy: &Policy) -> Result<()> {
        let beamline = policy.beamline.clone();
        let body = serde_json::to_string(policy)?;
        self.blocking(move |conn| {
            match conn.execute(
                "INSERT INTO policies (beamline, body) VALUES (?1, ?2)",
                params![beamline, body],
            ) {
                Ok(_) => Ok(()),
                Err(e) if is_constraint_violation(&e) => {
                    Err(Error::already_exists(Entity::Policy, beamline))
                }
                Err(e) => Err(db(e)),
            }
        })
        .await
    }

    async fn get(&self, beamline: &str) -> Result<Option<Policy>> {
        let beamline = beamline.to_string();
        self.blocking(move |conn| {
            let body: Option<String> = conn
                .query_row(
                    "SELECT body FROM policies WHERE beamline = ?1",
                    params![beamline],
                    |row| row.get(0),
                )
                .optional()
                .map_err(db)?;
            body.map(|b| decode_policy(&beamline, &b)).transpose()
        })
        .await
    }

    async fn update(&self, policy: &Policy) -> Result<()> {
        let beamline = policy.beamline.clone();
        let body = serde_json::to_string(policy)?;
        self.blocking(move |conn| {
            let updated = conn
                .execute(
                    "UPDATE policies SET body = ?1 WHERE beamline = ?2",
                    params![body, beamline],
                )
                .map_err(db)?;
            if updated == 0 {
                return Err(Error::not_found(Entity::Policy, beamline));
            }
            Ok(())
        })
        .await
    }

    async fn delete(&self, beamline: &str) -> Result<bool> {
        let beamline = beamline.to_string();
        self.blocking(move |conn| {
            let removed = conn
                .execute("DELETE FROM policies WHERE beamline = ?1", params![beamline])
                .map_err(db)?;
            Ok(removed > 0)
        })
        .await
    }

    async fn list(&self) -> Result<Vec<Policy>> {
        self.blocking(|conn| {
            let mut stmt = conn
                .prepare("SELECT beamline, body FROM policies ORDER BY beamline")
                .map_err(db)?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
                .map_err(db)?;

            let mut policies = Vec::new();
            for row in rows {
                let (beamline, body) = row.map_err(db)?;
                policies.push(decode_policy(&beamline, &body)?);
            }
            Ok(policies)
        })
        .await
    }

    async fn ping(&self) -> Result<()> {
        DatasetStore::ping(self).await
    }
}
