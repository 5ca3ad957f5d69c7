//! SQLite DDL for the feed record store.
//!
//! All `CREATE TABLE` / `CREATE INDEX` statements live here so they are
//! reviewable and testable in isolation.

use rusqlite::Connection;

/// Current schema version, stamped into `schema_meta`.
pub(crate) const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Complete DDL for the record store database.
///
/// Uses `IF NOT EXISTS` throughout so `apply_schema` is idempotent.
pub(crate) const SCHEMA_SQL: &str = r#"
-- Enable WAL mode for concurrent reads during writes.
PRAGMA journal_mode = WAL;

-- Schema version tracking.
CREATE TABLE IF NOT EXISTS schema_meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- Synchronized feed records — mirrors FeedRecord fields.
CREATE TABLE IF NOT EXISTS feed_records (
    id           INTEGER PRIMARY KEY,  -- server-assigned identity
    title        TEXT NOT NULL DEFAULT '',
    overview     TEXT NOT NULL DEFAULT '',
    poster_ref   TEXT,
    release_date INTEGER NOT NULL DEFAULT 0,  -- epoch seconds, UTC
    popularity   REAL NOT NULL DEFAULT 0,
    page         INTEGER NOT NULL DEFAULT 0
);

-- Indexes for the two pipeline query shapes.
CREATE INDEX IF NOT EXISTS idx_records_page         ON feed_records(page);
CREATE INDEX IF NOT EXISTS idx_records_release_date ON feed_records(release_date);
"#;

/// Apply the full schema to an open connection.
///
/// Safe to call multiple times — all statements use `IF NOT EXISTS`.
/// Stamps the current schema version into `schema_meta` on a fresh
/// database.
pub(crate) fn apply_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    let version_str = CURRENT_SCHEMA_VERSION.to_string();
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', ?1)",
        rusqlite::params![version_str],
    )?;

    Ok(())
}

/// Read the current schema version from the database.
///
/// Returns `None` if the `schema_meta` table is empty or the key is
/// missing.
pub(crate) fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<u32>> {
    let mut stmt = conn.prepare("SELECT value FROM schema_meta WHERE key = 'schema_version'")?;
    let mut rows = stmt.query([])?;
    match rows.next()? {
        Some(row) => {
            let val: String = row.get(0)?;
            Ok(val.parse::<u32>().ok())
        }
        None => Ok(None),
    }
}
