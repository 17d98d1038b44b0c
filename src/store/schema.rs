//! SQLite DDL definitions for the task store.

use rusqlite::Connection;

/// Complete DDL for the task database.
///
/// Uses `IF NOT EXISTS` throughout so `apply_schema` is idempotent.
pub(crate) const SCHEMA_SQL: &str = r#"
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS schema_meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- AUTOINCREMENT keeps ids of deleted rows from being handed out again.
CREATE TABLE IF NOT EXISTS tasks (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    title            TEXT NOT NULL,
    description      TEXT,
    status           INTEGER NOT NULL DEFAULT 0,   -- 0 todo, 1 in progress, 2 done
    priority         INTEGER NOT NULL DEFAULT 1,   -- 1 low, 2 medium, 3 high
    created_at       TEXT NOT NULL,                -- RFC 3339, UTC
    updated_at       TEXT NOT NULL,                -- RFC 3339, UTC
    due_date         TEXT,                         -- local wall clock
    has_notification INTEGER NOT NULL DEFAULT 0,
    tags             TEXT
);

CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);
"#;

/// Apply the full schema to an open connection and seed the version.
pub(crate) fn apply_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    let version_str = super::CURRENT_SCHEMA_VERSION.to_string();
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', ?1)",
        rusqlite::params![version_str],
    )?;

    Ok(())
}

/// Read the schema version, `None` if it was never stamped.
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

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
