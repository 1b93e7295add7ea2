// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use rusqlite::{Connection, Row, params};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use time::OffsetDateTime;
use todo_app::{StoreError, StoreResult, Task, TaskId, TaskStore, to_local};
use tracing::{debug, info};

pub const APP_NAME: &str = "todo";
pub const DB_FILE_NAME: &str = "todo.sqlite";

const REQUIRED_COLUMNS: &[&str] = &["id", "title", "complete", "due_date"];
const REQUIRED_INDEXES: &[&str] = &["idx_tasks_due_date"];

const UPDATE_TASK_SQL: &str = "UPDATE tasks SET title = ?, complete = ?, due_date = ? WHERE id = ?";

/// SQLite-backed task store.
///
/// A single connection sits behind a mutex, so callers are serialized and
/// the store can be shared across threads. `close` releases the connection;
/// every later call fails with [`StoreError::Closed`].
pub struct Store {
    conn: Mutex<Option<Connection>>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        debug!(path = %path.display(), "opened task database");
        Ok(Self::from_connection(conn))
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(Some(conn)),
        }
    }

    pub fn bootstrap(&self) -> Result<()> {
        let guard = self.lock();
        let conn = guard
            .as_ref()
            .ok_or_else(|| anyhow!("cannot bootstrap a closed task store"))?;

        if table_exists(conn, "tasks")? {
            validate_schema(conn)?;
        } else {
            info!("creating task schema");
            conn.execute_batch(include_str!("sql/schema.sql"))
                .context("create schema")?;
        }
        ensure_required_indexes(conn)
    }

    pub fn is_closed(&self) -> bool {
        self.lock().is_none()
    }

    /// Runs `f` against the raw connection; intended for inspection in tests and tooling.
    pub fn with_raw_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T> {
        let guard = self.lock();
        let conn = guard
            .as_ref()
            .ok_or_else(|| anyhow!("task store is closed"))?;
        f(conn).context("raw query")
    }

    fn lock(&self) -> MutexGuard<'_, Option<Connection>> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> StoreResult<T>) -> StoreResult<T> {
        let mut guard = self.lock();
        let conn = guard.as_mut().ok_or(StoreError::Closed)?;
        f(conn)
    }
}

impl TaskStore for Store {
    fn save_task(&self, title: &str, due_date: OffsetDateTime) -> StoreResult<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction().map_err(sql("begin save task"))?;
            tx.execute(
                "INSERT INTO tasks (title, due_date) VALUES (?, ?)",
                params![title, due_date.unix_timestamp()],
            )
            .map_err(sql("insert task"))?;
            let id = tx.last_insert_rowid();
            tx.commit().map_err(sql("commit save task"))?;
            debug!(task_id = id, title, "saved task");
            Ok(())
        })
    }

    fn get_tasks(&self) -> StoreResult<Vec<Task>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "
                    SELECT id, title, complete, due_date
                    FROM tasks
                    ORDER BY due_date ASC, id ASC
                    ",
                )
                .map_err(sql("prepare tasks query"))?;
            let rows = stmt
                .query_map([], task_from_row)
                .map_err(sql("query tasks"))?;
            let tasks = rows
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(sql("collect tasks"))?;
            debug!(count = tasks.len(), "loaded tasks");
            Ok(tasks)
        })
    }

    fn update_task(&self, task: &Task) -> StoreResult<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction().map_err(sql("begin update task"))?;
            if write_task(&tx, task)? == 0 {
                return Err(StoreError::NotFound(task.id));
            }
            tx.commit().map_err(sql("commit update task"))?;
            debug!(task_id = %task.id, complete = task.complete, "updated task");
            Ok(())
        })
    }

    /// Rows deleted elsewhere are skipped; any SQLite failure rolls back the batch.
    fn update_tasks(&self, tasks: &[Task]) -> StoreResult<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction().map_err(sql("begin update tasks"))?;
            let mut skipped = 0usize;
            for task in tasks {
                if write_task(&tx, task)? == 0 {
                    debug!(task_id = %task.id, "task vanished before batch update");
                    skipped += 1;
                }
            }
            tx.commit().map_err(sql("commit update tasks"))?;
            debug!(count = tasks.len(), skipped, "updated task batch");
            Ok(())
        })
    }

    fn delete_task_by_id(&self, id: TaskId) -> StoreResult<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction().map_err(sql("begin delete task"))?;
            let rows_affected = tx
                .execute("DELETE FROM tasks WHERE id = ?", params![id.get()])
                .map_err(sql("delete task"))?;
            if rows_affected == 0 {
                return Err(StoreError::NotFound(id));
            }
            tx.commit().map_err(sql("commit delete task"))?;
            debug!(task_id = %id, "deleted task");
            Ok(())
        })
    }

    fn close(&self) -> StoreResult<()> {
        let mut guard = self.lock();
        let Some(conn) = guard.take() else {
            return Ok(());
        };
        match conn.close() {
            Ok(()) => {
                debug!("closed task database");
                Ok(())
            }
            Err((conn, error)) => {
                *guard = Some(conn);
                Err(StoreError::sqlite("close database", error))
            }
        }
    }
}

fn sql(op: &'static str) -> impl Fn(rusqlite::Error) -> StoreError {
    move |error| StoreError::sqlite(op, error)
}

fn write_task(conn: &Connection, task: &Task) -> StoreResult<usize> {
    conn.execute(
        UPDATE_TASK_SQL,
        params![
            task.title,
            task.complete,
            task.due_date.unix_timestamp(),
            task.id.get(),
        ],
    )
    .map_err(sql("update task"))
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    let due_raw: i64 = row.get(3)?;
    let due_date = OffsetDateTime::from_unix_timestamp(due_raw).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Integer,
            Box::new(error),
        )
    })?;

    Ok(Task {
        id: TaskId::new(row.get(0)?),
        title: row.get(1)?,
        complete: row.get(2)?,
        due_date: to_local(due_date),
    })
}

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("TODO_DB") {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set TODO_DB to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join(DB_FILE_NAME))
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("database path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "database path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("database path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!(
            "database path {path:?} contains '?'; remove query parameters and use a plain file path"
        );
    }

    Ok(())
}

fn validate_schema(conn: &Connection) -> Result<()> {
    let columns = table_columns(conn, "tasks")?;
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|column| !columns.contains(*column))
        .collect();

    if !missing.is_empty() {
        bail!(
            "table `tasks` is missing required columns: {}; point TODO_DB at a todo database",
            missing.join(", ")
        );
    }
    Ok(())
}

fn ensure_required_indexes(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE INDEX IF NOT EXISTS idx_tasks_due_date ON tasks (due_date);")
        .context("ensure required index `idx_tasks_due_date`")?;

    let existing = index_names(conn)?;
    let missing = REQUIRED_INDEXES
        .iter()
        .copied()
        .filter(|name| !existing.contains(*name))
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        bail!("database is missing required indexes: {}", missing.join(", "));
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let exists = conn
        .query_row(
            "
            SELECT EXISTS(
              SELECT 1
              FROM sqlite_master
              WHERE type = 'table' AND name = ?
            )
            ",
            params![table],
            |row| row.get::<_, i64>(0),
        )
        .with_context(|| format!("check table existence for {table}"))?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("inspect columns for {table}"))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .with_context(|| format!("query column info for {table}"))?;

    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .with_context(|| format!("collect columns for {table}"))
}

fn index_names(conn: &Connection) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(
            "
            SELECT name
            FROM sqlite_master
            WHERE type = 'index'
              AND name NOT LIKE 'sqlite_%'
            ORDER BY name ASC
            ",
        )
        .context("prepare index names query")?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .context("query index names")?;
    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .context("collect index names")
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}
