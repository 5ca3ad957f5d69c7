//! SQLite-backed record store.
//!
//! Backed by a single database file at `{data_dir}/cinefeed.db`.
//! Thread-safe via an internal `Mutex<Connection>`; every insert and
//! delete is a single implicit transaction, honoring the per-item
//! commit contract.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params};

use super::schema::{apply_schema, read_schema_version};
use super::types::FeedRecord;
use super::{RecordStore, StoreError};

/// Database filename within the data directory.
const DB_FILENAME: &str = "cinefeed.db";

/// SQLite-backed record store.
pub struct SqliteStore {
    path: PathBuf,
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `{data_dir}/cinefeed.db`.
    ///
    /// Applies the schema if the database is new.
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(data_dir).map_err(|e| StoreError::Io(e.to_string()))?;
        let db_path = data_dir.join(DB_FILENAME);
        let conn = Connection::open(&db_path)?;
        apply_schema(&conn)?;
        Ok(Self {
            path: db_path,
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory store. Used by tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Mutex::new(conn),
        })
    }

    /// Path of the backing database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the schema version stamp.
    pub fn schema_version(&self) -> Result<Option<u32>, StoreError> {
        let conn = self.lock()?;
        Ok(read_schema_version(&conn)?)
    }

    /// Acquire the connection mutex.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|e| StoreError::Lock(e.to_string()))
    }
}

impl RecordStore for SqliteStore {
    fn latest_by_page(&self) -> Result<Option<FeedRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, title, overview, poster_ref, release_date, popularity, page \
             FROM feed_records ORDER BY page DESC LIMIT 1",
        )?;
        let mut rows = stmt.query([])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_record(row)?)),
            None => Ok(None),
        }
    }

    fn insert(&self, record: &FeedRecord) -> Result<(), StoreError> {
        let conn = self.lock()?;
        // REPLACE mirrors a store-trump merge: a re-downloaded record
        // overwrites the previously synced copy.
        conn.execute(
            "INSERT OR REPLACE INTO feed_records \
             (id, title, overview, poster_ref, release_date, popularity, page) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.id,
                record.title,
                record.overview,
                record.poster_ref,
                record.release_date.timestamp(),
                record.popularity,
                record.page,
            ],
        )?;
        Ok(())
    }

    fn delete(&self, id: i64) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM feed_records WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn stale_records(&self, cutoff: DateTime<Utc>) -> Result<Vec<FeedRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, title, overview, poster_ref, release_date, popularity, page \
             FROM feed_records WHERE release_date < ?1 ORDER BY release_date ASC",
        )?;
        let rows = stmt.query_map(params![cutoff.timestamp()], |row| row_to_record(row))?;

        let mut records = Vec::new();
        for r in rows {
            records.push(r?);
        }
        Ok(records)
    }

    fn count(&self) -> Result<u64, StoreError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM feed_records", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn delete_all(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM feed_records", [])?;
        Ok(())
    }
}

/// Map a result row to a [`FeedRecord`].
fn row_to_record(row: &Row<'_>) -> rusqlite::Result<FeedRecord> {
    let release_secs: i64 = row.get(4)?;
    Ok(FeedRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        overview: row.get(2)?,
        poster_ref: row.get(3)?,
        release_date: DateTime::from_timestamp(release_secs, 0).unwrap_or_default(),
        popularity: row.get(5)?,
        page: row.get(6)?,
    })
}
