//! SQLite-backed versioned store with the relational layout.
//!
//! ```text
//! store_meta(key, value)                              - layout schema version
//! config_metadata(path PK, latest_version, current_version, created_at, updated_at)
//! config(path, version, position, value)              - PK (path, version, position)
//! ```
//!
//! A write reads the metadata row, bumps it and inserts one `config` row per
//! value inside a single immediate transaction. Readers see either the whole
//! write or none of it.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};

use crate::{Metadata, SetOptions, StoreError, Version, VersionStore, path};

/// Current table layout version.
const SQL_SCHEMA_VERSION: u32 = 1;

/// Versioned store kept in one SQLite database.
///
/// All calls share one connection. SQLite admits a single writer at a time, so
/// writes to different paths serialize here as well.
pub struct SqliteStore {
    location: Option<PathBuf>,
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database file at `db_path`.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&db_path)?;
        conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get::<_, String>(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Self::migrate(conn, Some(db_path))
    }

    /// Private database that disappears with the store.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::migrate(Connection::open_in_memory()?, None)
    }

    fn migrate(conn: Connection, location: Option<PathBuf>) -> Result<Self, StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS store_meta (
              key TEXT PRIMARY KEY,
              value INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS config_metadata (
              path TEXT PRIMARY KEY,
              latest_version INTEGER NOT NULL,
              current_version INTEGER NOT NULL,
              created_at TEXT NOT NULL,
              updated_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS config (
              path TEXT NOT NULL,
              version INTEGER NOT NULL,
              position INTEGER NOT NULL,
              value TEXT NOT NULL,
              PRIMARY KEY (path, version, position)
            );
            "#,
        )?;

        let found: Option<u32> = conn
            .query_row(
                "SELECT value FROM store_meta WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        match found {
            None => {
                conn.execute(
                    "INSERT INTO store_meta(key, value) VALUES ('schema_version', ?1)",
                    params![SQL_SCHEMA_VERSION],
                )?;
            }
            Some(version) if version == SQL_SCHEMA_VERSION => {}
            Some(version) => {
                return Err(StoreError::SchemaMismatch {
                    file_version: version,
                    expected_version: SQL_SCHEMA_VERSION,
                });
            }
        }

        match &location {
            Some(db_path) => tracing::debug!(db = %db_path.display(), "opened sqlite store"),
            None => tracing::debug!("opened in-memory sqlite store"),
        }
        Ok(Self {
            location,
            conn: Mutex::new(conn),
        })
    }

    /// Database file, or `None` for an in-memory store.
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Every stored path, sorted.
    pub fn paths(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT path FROM config_metadata ORDER BY path")?;
        let paths = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(paths)
    }

    /// Check that pointers are ordered and that every value row belongs to a
    /// committed version of a path with metadata.
    pub fn verify_integrity(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock();

        let misordered: Option<(String, i64, i64)> = conn
            .query_row(
                "SELECT path, current_version, latest_version FROM config_metadata \
                 WHERE current_version > latest_version LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        if let Some((path, current, latest)) = misordered {
            return Err(StoreError::IntegrityMismatch {
                expected: format!("{path}: current_version <= {latest}"),
                actual: format!("current_version = {current}"),
            });
        }

        let stray: Option<(String, i64)> = conn
            .query_row(
                "SELECT c.path, c.version FROM config c \
                 LEFT JOIN config_metadata m ON m.path = c.path \
                 WHERE m.path IS NULL OR c.version < 1 OR c.version > m.latest_version LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        if let Some((path, version)) = stray {
            return Err(StoreError::IntegrityMismatch {
                expected: format!("values of {path} only for committed versions"),
                actual: format!("values recorded for version {version}"),
            });
        }
        Ok(())
    }
}

impl VersionStore for SqliteStore {
    fn get_many_current(&self, path: &str) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock();
        let meta = read_metadata(&conn, path)?.ok_or_else(|| StoreError::not_found(path))?;
        read_values(&conn, path, meta.current_version)
    }

    fn get_many(&self, path: &str, version: Version) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock();
        if read_metadata(&conn, path)?.is_none() {
            return Err(StoreError::not_found(path));
        }
        read_values(&conn, path, version)
    }

    fn set_many(
        &self,
        path: &str,
        values: &[String],
        options: SetOptions,
    ) -> Result<Metadata, StoreError> {
        path::validate(path)?;
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut meta = read_metadata(&tx, path)?.unwrap_or_else(|| Metadata::new(path));
        let version = meta.advance(options);
        tx.execute(
            r#"
            INSERT INTO config_metadata(path, latest_version, current_version, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(path) DO UPDATE SET
              latest_version = excluded.latest_version,
              current_version = excluded.current_version,
              updated_at = excluded.updated_at
            "#,
            params![
                path,
                to_sql(meta.latest_version),
                to_sql(meta.current_version),
                meta.created_at,
                meta.updated_at
            ],
        )?;
        {
            let mut insert = tx.prepare_cached(
                "INSERT INTO config(path, version, position, value) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (position, value) in values.iter().enumerate() {
                insert.execute(params![path, to_sql(version), position as i64, value])?;
            }
        }
        tx.commit()?;

        tracing::debug!(
            path,
            version,
            current = meta.current_version,
            count = values.len(),
            "committed value set"
        );
        Ok(meta)
    }

    fn metadata(&self, path: &str) -> Result<Metadata, StoreError> {
        read_metadata(&self.conn.lock(), path)?.ok_or_else(|| StoreError::not_found(path))
    }
}

fn read_metadata(conn: &Connection, path: &str) -> Result<Option<Metadata>, StoreError> {
    Ok(conn
        .query_row(
            "SELECT latest_version, current_version, created_at, updated_at \
             FROM config_metadata WHERE path = ?1",
            params![path],
            |row| metadata_from_row(path, row),
        )
        .optional()?)
}

fn metadata_from_row(path: &str, row: &Row<'_>) -> rusqlite::Result<Metadata> {
    Ok(Metadata {
        path: path.to_string(),
        latest_version: from_sql(row.get(0)?),
        current_version: from_sql(row.get(1)?),
        created_at: row.get(2)?,
        updated_at: row.get(3)?,
    })
}

fn read_values(conn: &Connection, path: &str, version: Version) -> Result<Vec<String>, StoreError> {
    let mut stmt = conn.prepare_cached(
        "SELECT value FROM config WHERE path = ?1 AND version = ?2 ORDER BY position",
    )?;
    let values = stmt
        .query_map(params![path, to_sql(version)], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(values)
}

// SQLite integers are signed; versions stay far below i64::MAX.
fn to_sql(version: Version) -> i64 {
    i64::try_from(version).unwrap_or(i64::MAX)
}

fn from_sql(version: i64) -> Version {
    Version::try_from(version).unwrap_or_default()
}
