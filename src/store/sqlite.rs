//! SQLite-backed task store.
//!
//! One connection behind a `Mutex`; every mutation is serialized. The store
//! stamps `createdAt` on insert, refreshes `updatedAt` on every update and
//! never reuses ids.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use super::schema::{apply_schema, read_schema_version};
use crate::task::mapper::{
    format_wall_clock, parse_wall_clock, priority_code, priority_from_wire, status_code,
    status_from_wire,
};
use crate::task::{ApiTask, DESCRIPTION_MAX_CHARS, TITLE_MAX_CHARS, TaskPayload, WireEnum};

const SELECT_COLUMNS: &str = "SELECT id, title, description, status, priority, created_at, \
     updated_at, due_date, has_notification, tags FROM tasks";

/// SQLite-backed task store.
pub struct SqliteTaskStore {
    path: Option<PathBuf>,
    conn: Mutex<Connection>,
}

impl SqliteTaskStore {
    /// Open (or create) the database file at `path`, creating parent
    /// directories as needed.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
        }
        let conn = Connection::open(path)?;
        apply_schema(&conn)?;
        debug!(path = %path.display(), "opened task store");
        Ok(Self {
            path: Some(path.to_path_buf()),
            conn: Mutex::new(conn),
        })
    }

    /// Open a throwaway in-memory store.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self {
            path: None,
            conn: Mutex::new(conn),
        })
    }

    /// Database file path, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn schema_version(&self) -> Result<Option<u32>, StoreError> {
        let conn = self.lock()?;
        Ok(read_schema_version(&conn)?)
    }

    /// All tasks, in id order.
    pub fn list(&self) -> Result<Vec<ApiTask>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY id"))?;
        let rows = stmt.query_map([], row_to_task)?;

        let mut tasks = Vec::new();
        for r in rows {
            tasks.push(r?);
        }
        Ok(tasks)
    }

    pub fn get(&self, id: i64) -> Result<ApiTask, StoreError> {
        let conn = self.lock()?;
        fetch(&conn, id)?.ok_or(StoreError::NotFound(id))
    }

    /// Insert a new task. Any id or timestamps in `payload` are ignored.
    pub fn create(&self, payload: &TaskPayload) -> Result<ApiTask, StoreError> {
        let row = ValidatedRow::from_payload(payload)?;
        let now = timestamp(&Utc::now());
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO tasks \
             (title, description, status, priority, created_at, updated_at, due_date, \
              has_notification, tags) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                row.title,
                row.description,
                row.status,
                row.priority,
                now,
                now,
                row.due_date,
                row.has_notification,
                row.tags
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!(task_id = id, "created task");

        fetch(&conn, id)?.ok_or(StoreError::NotFound(id))
    }

    /// Replace every editable field of task `id`; `created_at` is kept.
    pub fn update(&self, id: i64, payload: &TaskPayload) -> Result<ApiTask, StoreError> {
        let row = ValidatedRow::from_payload(payload)?;
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        // Never let the refreshed stamp fall behind the stored one.
        let previous: Option<String> = tx
            .query_row(
                "SELECT updated_at FROM tasks WHERE id = ?1",
                params![id],
                |r| r.get(0),
            )
            .optional()?;
        let Some(previous) = previous else {
            return Err(StoreError::NotFound(id));
        };
        let mut now = Utc::now();
        if let Ok(previous) = DateTime::parse_from_rfc3339(&previous) {
            now = now.max(previous.with_timezone(&Utc));
        }

        let rows = tx.execute(
            "UPDATE tasks SET title = ?1, description = ?2, status = ?3, priority = ?4, \
             updated_at = ?5, due_date = ?6, has_notification = ?7, tags = ?8 \
             WHERE id = ?9 AND updated_at = ?10",
            params![
                row.title,
                row.description,
                row.status,
                row.priority,
                timestamp(&now),
                row.due_date,
                row.has_notification,
                row.tags,
                id,
                previous
            ],
        )?;

        if rows == 0 {
            let exists = tx
                .query_row("SELECT 1 FROM tasks WHERE id = ?1", params![id], |_| Ok(()))
                .optional()?
                .is_some();
            return Err(if exists {
                StoreError::Conflict(id)
            } else {
                StoreError::NotFound(id)
            });
        }

        let updated = fetch(&tx, id)?.ok_or(StoreError::NotFound(id))?;
        tx.commit()?;
        debug!(task_id = id, "updated task");
        Ok(updated)
    }

    pub fn delete(&self, id: i64) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let rows = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(StoreError::NotFound(id));
        }
        debug!(task_id = id, "deleted task");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|e| StoreError::Lock(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors from the SQLite task store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("task not found: {0}")]
    NotFound(i64),

    #[error("invalid task: {0}")]
    Validation(String),

    #[error("task {0} was modified concurrently")]
    Conflict(i64),

    #[error("lock poisoned: {0}")]
    Lock(String),
}

// ---------------------------------------------------------------------------
// Payload validation
// ---------------------------------------------------------------------------

/// A payload checked and normalized into column values.
struct ValidatedRow {
    title: String,
    description: Option<String>,
    status: i64,
    priority: i64,
    due_date: Option<String>,
    has_notification: bool,
    tags: Option<String>,
}

impl ValidatedRow {
    fn from_payload(payload: &TaskPayload) -> Result<Self, StoreError> {
        let title = payload.title.trim();
        if title.is_empty() {
            return Err(StoreError::Validation("title is required".to_owned()));
        }
        if title.chars().count() > TITLE_MAX_CHARS {
            return Err(StoreError::Validation(format!(
                "title exceeds {TITLE_MAX_CHARS} characters"
            )));
        }
        if let Some(description) = &payload.description
            && description.chars().count() > DESCRIPTION_MAX_CHARS
        {
            return Err(StoreError::Validation(format!(
                "description exceeds {DESCRIPTION_MAX_CHARS} characters"
            )));
        }
        let due_date = match payload.due_date.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => {
                let naive = parse_wall_clock(raw).ok_or_else(|| {
                    StoreError::Validation(format!("invalid due date: {raw:?}"))
                })?;
                Some(format_wall_clock(&naive))
            }
        };
        let tags = payload
            .tags
            .as_deref()
            .map(str::trim)
            .filter(|tags| !tags.is_empty())
            .map(str::to_owned);

        Ok(Self {
            title: title.to_owned(),
            description: payload
                .description
                .clone()
                .filter(|d| !d.trim().is_empty()),
            status: status_code(status_from_wire(&payload.status)),
            priority: priority_code(priority_from_wire(&payload.priority)),
            due_date,
            has_notification: payload.has_notification.unwrap_or(false),
            tags,
        })
    }
}

// ---------------------------------------------------------------------------
// Row conversion helpers
// ---------------------------------------------------------------------------

fn fetch(conn: &Connection, id: i64) -> rusqlite::Result<Option<ApiTask>> {
    conn.query_row(
        &format!("{SELECT_COLUMNS} WHERE id = ?1"),
        params![id],
        row_to_task,
    )
    .optional()
}

fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<ApiTask> {
    Ok(ApiTask {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        status: WireEnum::Code(row.get(3)?),
        priority: WireEnum::Code(row.get(4)?),
        created_at: parse_timestamp(row, 5)?,
        updated_at: parse_timestamp(row, 6)?,
        due_date: row.get(7)?,
        has_notification: Some(row.get(8)?),
        tags: row.get(9)?,
    })
}

fn parse_timestamp(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(title: &str) -> TaskPayload {
        TaskPayload {
            title: title.to_owned(),
            status: WireEnum::Code(0),
            priority: WireEnum::Code(2),
            ..TaskPayload::default()
        }
    }

    fn test_store() -> (tempfile::TempDir, SqliteTaskStore) {
        let dir = tempfile::TempDir::new().expect("create temp dir");
        let store = SqliteTaskStore::open(&dir.path().join("kanban.db")).expect("open store");
        (dir, store)
    }

    #[test]
    fn create_stamps_timestamps_and_assigns_id() {
        let (_dir, store) = test_store();
        let created = store.create(&payload("Write tests")).expect("create");
        assert!(created.id > 0);
        assert_eq!(created.created_at, created.updated_at);
        assert_eq!(created.status, WireEnum::Code(0));
        assert_eq!(created.priority, WireEnum::Code(2));
        assert_eq!(store.list().expect("list").len(), 1);
    }

    #[test]
    fn create_ignores_client_supplied_id() {
        let store = SqliteTaskStore::open_in_memory().expect("open");
        let mut p = payload("x");
        p.id = Some(999);
        let created = store.create(&p).expect("create");
        assert_ne!(created.id, 999);
    }

    #[test]
    fn update_keeps_created_at_and_refreshes_updated_at() {
        let store = SqliteTaskStore::open_in_memory().expect("open");
        let created = store.create(&payload("Draft")).expect("create");

        let mut p = payload("Final");
        p.id = Some(created.id);
        p.status = WireEnum::Code(2);
        let updated = store.update(created.id, &p).expect("update");

        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(updated.title, "Final");
        assert_eq!(updated.status, WireEnum::Code(2));
    }

    #[test]
    fn update_missing_task_is_not_found() {
        let store = SqliteTaskStore::open_in_memory().expect("open");
        let err = store.update(41, &payload("x")).expect_err("missing");
        assert!(matches!(err, StoreError::NotFound(41)));
    }

    #[test]
    fn delete_removes_row_and_ids_are_not_reused() {
        let store = SqliteTaskStore::open_in_memory().expect("open");
        let first = store.create(&payload("a")).expect("create");
        store.delete(first.id).expect("delete");
        assert!(matches!(store.get(first.id), Err(StoreError::NotFound(_))));
        assert!(matches!(store.delete(first.id), Err(StoreError::NotFound(_))));

        let second = store.create(&payload("b")).expect("create");
        assert!(second.id > first.id);
    }

    #[test]
    fn validation_rejects_bad_payloads() {
        let store = SqliteTaskStore::open_in_memory().expect("open");
        assert!(matches!(
            store.create(&payload("  ")),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            store.create(&payload(&"t".repeat(TITLE_MAX_CHARS + 1))),
            Err(StoreError::Validation(_))
        ));

        let mut long_description = payload("ok");
        long_description.description = Some("d".repeat(DESCRIPTION_MAX_CHARS + 1));
        assert!(matches!(
            store.create(&long_description),
            Err(StoreError::Validation(_))
        ));

        let mut bad_due = payload("ok");
        bad_due.due_date = Some("next tuesday".to_owned());
        assert!(matches!(
            store.create(&bad_due),
            Err(StoreError::Validation(_))
        ));
        assert!(store.list().expect("list").is_empty());
    }

    #[test]
    fn symbolic_and_unknown_enums_are_normalized() {
        let store = SqliteTaskStore::open_in_memory().expect("open");
        let mut p = payload("x");
        p.status = WireEnum::Symbol("InProgress".to_owned());
        p.priority = WireEnum::Code(42);
        let created = store.create(&p).expect("create");
        assert_eq!(created.status, WireEnum::Code(1));
        assert_eq!(created.priority, WireEnum::Code(1));
    }

    #[test]
    fn due_date_and_tags_are_stored_verbatim() {
        let store = SqliteTaskStore::open_in_memory().expect("open");
        let mut p = payload("x");
        p.due_date = Some("2024-06-01T09:30:00.000Z".to_owned());
        p.tags = Some("a, b".to_owned());
        p.has_notification = Some(true);
        let created = store.create(&p).expect("create");
        assert_eq!(created.due_date.as_deref(), Some("2024-06-01T09:30:00"));
        assert_eq!(created.tags.as_deref(), Some("a, b"));
        assert_eq!(created.has_notification, Some(true));
    }

    #[test]
    fn reopen_preserves_tasks() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let path = dir.path().join("nested").join("kanban.db");
        {
            let store = SqliteTaskStore::open(&path).expect("open");
            store.create(&payload("persisted")).expect("create");
        }
        let store = SqliteTaskStore::open(&path).expect("reopen");
        let tasks = store.list().expect("list");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "persisted");
        assert_eq!(
            store.schema_version().expect("version"),
            Some(super::super::CURRENT_SCHEMA_VERSION)
        );
    }

    #[test]
    fn concurrent_creates_preserve_every_task() {
        let (_dir, store) = test_store();
        let store = std::sync::Arc::new(store);

        let mut handles = Vec::new();
        for i in 0..10 {
            let s = std::sync::Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                s.create(&payload(&format!("task {i}")))
                    .expect("concurrent create");
            }));
        }
        for h in handles {
            h.join().expect("thread join");
        }

        assert_eq!(store.list().expect("list").len(), 10);
    }
}
