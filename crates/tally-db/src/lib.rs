//! Storage layer for the hour tracker.
//!
//! Implements the record-store traits of `tally-core` on top of `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` instance can be moved between threads but cannot be shared
//! across threads without external synchronization. Use one instance per thread.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in RFC 3339 format with millisecond precision
//! (e.g., `2025-03-10T09:00:00.000Z`). This ensures:
//! - Lexicographic ordering matches chronological ordering
//! - Human-readable values in the database
//! - Timezone-aware (always UTC)
//!
//! ## Deletes
//!
//! Foreign keys are enforced but declared without `ON DELETE CASCADE`.
//! Removing a client or task that still has children fails; cascades are
//! driven by `tally_core::cascade`, one statement per step.

use std::path::Path;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use tally_core::model::{
    ClientPatch, NewClient, NewUser, TaskDraft, TaskPatch, TimeEntryChanges, TimeEntryDraft,
};
use tally_core::store::{StoreError, TaskFilter, TimeEntryFilter};
use tally_core::{
    Client, ClientId, ClientStore, Collection, Role, StoreOperation, Task, TaskId, TaskStore,
    TimeEntry, TimeEntryId, TimeEntryStore, User, UserId, UserStore, ValidationError,
    truncate_to_millis,
};
use thiserror::Error;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored timestamp is not valid RFC 3339.
    #[error("invalid timestamp in {table} row {id}: {timestamp}")]
    TimestampParse {
        table: &'static str,
        id: i64,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored value does not satisfy the domain type (id, status, role).
    #[error("invalid value in {table} row {id}")]
    InvalidRow {
        table: &'static str,
        id: i64,
        #[source]
        source: ValidationError,
    },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                role TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS clients (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                color TEXT NOT NULL
            );

            -- status: 'pending' | 'in_progress' | 'completed'
            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                client_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                assigned_to_id INTEGER NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                due_date TEXT,
                assignment_date TEXT NOT NULL,
                FOREIGN KEY (client_id) REFERENCES clients(id),
                FOREIGN KEY (assigned_to_id) REFERENCES users(id)
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_client ON tasks(client_id);
            CREATE INDEX IF NOT EXISTS idx_tasks_assigned ON tasks(assigned_to_id);

            -- duration_hours: always derived from start_time/end_time, unrounded
            CREATE TABLE IF NOT EXISTS time_entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                task_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                duration_hours REAL NOT NULL,
                FOREIGN KEY (task_id) REFERENCES tasks(id),
                FOREIGN KEY (user_id) REFERENCES users(id)
            );

            CREATE INDEX IF NOT EXISTS idx_time_entries_start ON time_entries(start_time);
            CREATE INDEX IF NOT EXISTS idx_time_entries_task ON time_entries(task_id);
            CREATE INDEX IF NOT EXISTS idx_time_entries_user ON time_entries(user_id);
            ",
        )?;
        Ok(())
    }

    fn insert_time_entry_row(&self, draft: &TimeEntryDraft) -> Result<TimeEntry, DbError> {
        self.conn.execute(
            "
            INSERT INTO time_entries (task_id, user_id, start_time, end_time, duration_hours)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
            params![
                draft.task_id().get(),
                draft.user_id().get(),
                format_timestamp(draft.start_time()),
                format_timestamp(draft.end_time()),
                draft.duration_hours(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(id, "inserted time entry");
        Ok(TimeEntry {
            id: record_id("time_entries", id, id)?,
            task_id: draft.task_id(),
            user_id: draft.user_id(),
            start_time: draft.start_time(),
            end_time: draft.end_time(),
            duration_hours: draft.duration_hours(),
        })
    }

    /// Lists time entries matching the filter, ordered by start time then ID.
    fn time_entry_rows(&self, filter: &TimeEntryFilter) -> Result<Vec<TimeEntry>, DbError> {
        let mut clauses = Vec::new();
        let mut values = Vec::new();
        if let Some(from) = filter.start_from {
            clauses.push("start_time >= ?");
            values.push(Value::Text(format_lower_bound(from)));
        }
        if let Some(until) = filter.start_until {
            clauses.push("start_time <= ?");
            values.push(Value::Text(format_timestamp(until)));
        }
        if let Some(until) = filter.end_until {
            clauses.push("end_time <= ?");
            values.push(Value::Text(format_timestamp(until)));
        }
        if let Some(task_id) = filter.task_id {
            clauses.push("task_id = ?");
            values.push(Value::Integer(task_id.get()));
        }
        if let Some(user_id) = filter.user_id {
            clauses.push("user_id = ?");
            values.push(Value::Integer(user_id.get()));
        }

        let sql = format!(
            "
            SELECT id, task_id, user_id, start_time, end_time, duration_hours
            FROM time_entries
            {}
            ORDER BY start_time ASC, id ASC
            ",
            where_clause(&clauses)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), TimeEntryRow::read)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(TimeEntry::try_from(row?)?);
        }
        Ok(entries)
    }

    fn time_entry_row(&self, id: TimeEntryId) -> Result<Option<TimeEntry>, DbError> {
        let row = self
            .conn
            .query_row(
                "
                SELECT id, task_id, user_id, start_time, end_time, duration_hours
                FROM time_entries
                WHERE id = ?1
                ",
                [id.get()],
                TimeEntryRow::read,
            )
            .optional()?;
        row.map(TimeEntry::try_from).transpose()
    }

    fn update_time_entry_row(
        &self,
        id: TimeEntryId,
        changes: &TimeEntryChanges,
    ) -> Result<Option<TimeEntry>, DbError> {
        let mut sets = Vec::new();
        let mut values = Vec::new();
        if let Some(task_id) = changes.task_id() {
            sets.push("task_id = ?");
            values.push(Value::Integer(task_id.get()));
        }
        if let Some((start, end, hours)) = changes.bounds() {
            sets.push("start_time = ?");
            values.push(Value::Text(format_timestamp(start)));
            sets.push("end_time = ?");
            values.push(Value::Text(format_timestamp(end)));
            sets.push("duration_hours = ?");
            values.push(Value::Real(hours));
        }
        if !self.update_row("time_entries", &sets, values, id.get())? {
            return Ok(None);
        }
        self.time_entry_row(id)
    }

    fn insert_task_row(&self, draft: &TaskDraft) -> Result<Task, DbError> {
        self.conn.execute(
            "
            INSERT INTO tasks (client_id, title, description, assigned_to_id, status, due_date, assignment_date)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
            params![
                draft.client_id.get(),
                draft.title,
                draft.description,
                draft.assigned_to_id.get(),
                draft.status.as_str(),
                draft.due_date.map(format_timestamp),
                format_timestamp(draft.assignment_date),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(id, "inserted task");
        Ok(Task {
            id: record_id("tasks", id, id)?,
            client_id: draft.client_id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            assigned_to_id: draft.assigned_to_id,
            status: draft.status,
            due_date: draft.due_date,
            assignment_date: draft.assignment_date,
        })
    }

    /// Lists tasks matching the filter, ordered by ID.
    fn task_rows(&self, filter: &TaskFilter) -> Result<Vec<Task>, DbError> {
        let mut clauses = Vec::new();
        let mut values = Vec::new();
        if let Some(client_id) = filter.client_id {
            clauses.push("client_id = ?");
            values.push(Value::Integer(client_id.get()));
        }
        if let Some(user_id) = filter.assigned_to_id {
            clauses.push("assigned_to_id = ?");
            values.push(Value::Integer(user_id.get()));
        }

        let sql = format!(
            "
            SELECT id, client_id, title, description, assigned_to_id, status, due_date, assignment_date
            FROM tasks
            {}
            ORDER BY id ASC
            ",
            where_clause(&clauses)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), TaskRow::read)?;
        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(Task::try_from(row?)?);
        }
        Ok(tasks)
    }

    fn task_row(&self, id: TaskId) -> Result<Option<Task>, DbError> {
        let row = self
            .conn
            .query_row(
                "
                SELECT id, client_id, title, description, assigned_to_id, status, due_date, assignment_date
                FROM tasks
                WHERE id = ?1
                ",
                [id.get()],
                TaskRow::read,
            )
            .optional()?;
        row.map(Task::try_from).transpose()
    }

    fn update_task_row(&self, id: TaskId, patch: &TaskPatch) -> Result<Option<Task>, DbError> {
        let mut sets = Vec::new();
        let mut values = Vec::new();
        if let Some(description) = &patch.description {
            sets.push("description = ?");
            values.push(Value::Text(description.clone()));
        }
        if let Some(status) = patch.status {
            sets.push("status = ?");
            values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(due_date) = patch.due_date {
            sets.push("due_date = ?");
            values.push(Value::Text(format_timestamp(due_date)));
        }
        if !self.update_row("tasks", &sets, values, id.get())? {
            return Ok(None);
        }
        self.task_row(id)
    }

    fn insert_client_row(&self, client: &NewClient) -> Result<Client, DbError> {
        self.conn.execute(
            "INSERT INTO clients (name, color) VALUES (?1, ?2)",
            params![client.name, client.color],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(id, "inserted client");
        Ok(Client {
            id: record_id("clients", id, id)?,
            name: client.name.clone(),
            color: client.color.clone(),
        })
    }

    fn client_rows(&self, id: Option<ClientId>) -> Result<Vec<Client>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, name, color
            FROM clients
            WHERE ?1 IS NULL OR id = ?1
            ORDER BY id ASC
            ",
        )?;
        let rows = stmt.query_map([id.map(ClientId::get)], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        let mut clients = Vec::new();
        for row in rows {
            let (id, name, color) = row?;
            clients.push(Client {
                id: record_id("clients", id, id)?,
                name,
                color,
            });
        }
        Ok(clients)
    }

    fn update_client_row(
        &self,
        id: ClientId,
        patch: &ClientPatch,
    ) -> Result<Option<Client>, DbError> {
        let mut sets = Vec::new();
        let mut values = Vec::new();
        if let Some(name) = &patch.name {
            sets.push("name = ?");
            values.push(Value::Text(name.clone()));
        }
        if let Some(color) = &patch.color {
            sets.push("color = ?");
            values.push(Value::Text(color.clone()));
        }
        if !self.update_row("clients", &sets, values, id.get())? {
            return Ok(None);
        }
        Ok(self.client_rows(Some(id))?.pop())
    }

    fn insert_user_row(&self, user: &NewUser) -> Result<User, DbError> {
        self.conn.execute(
            "INSERT INTO users (username, role) VALUES (?1, ?2)",
            params![user.username, user.role.as_str()],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(id, username = %user.username, "inserted user");
        Ok(User {
            id: record_id("users", id, id)?,
            username: user.username.clone(),
            role: user.role,
        })
    }

    fn user_rows(&self, username: Option<&str>) -> Result<Vec<User>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, username, role
            FROM users
            WHERE ?1 IS NULL OR username = ?1
            ORDER BY id ASC
            ",
        )?;
        let rows = stmt.query_map([username], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        let mut users = Vec::new();
        for row in rows {
            let (id, username, role) = row?;
            users.push(User {
                id: record_id("users", id, id)?,
                username,
                role: role
                    .parse::<Role>()
                    .map_err(|source| invalid_row("users", id, source))?,
            });
        }
        Ok(users)
    }

    /// Applies `SET` assignments to one row. Returns whether the row exists.
    fn update_row(
        &self,
        table: &'static str,
        sets: &[&str],
        mut values: Vec<Value>,
        id: i64,
    ) -> Result<bool, DbError> {
        if sets.is_empty() {
            let exists = self
                .conn
                .query_row(&format!("SELECT 1 FROM {table} WHERE id = ?1"), [id], |_| {
                    Ok(())
                })
                .optional()?;
            return Ok(exists.is_some());
        }
        values.push(Value::Integer(id));
        let sql = format!("UPDATE {table} SET {} WHERE id = ?", sets.join(", "));
        let changed = self.conn.execute(&sql, params_from_iter(values))?;
        tracing::debug!(table, id, changed, "updated row");
        Ok(changed > 0)
    }

    fn delete_row(&self, table: &'static str, id: i64) -> Result<bool, DbError> {
        let removed = self
            .conn
            .execute(&format!("DELETE FROM {table} WHERE id = ?1"), [id])?;
        tracing::debug!(table, id, removed, "deleted row");
        Ok(removed > 0)
    }
}

fn where_clause(clauses: &[&str]) -> String {
    if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    }
}

#[derive(Debug)]
struct TimeEntryRow {
    id: i64,
    task_id: i64,
    user_id: i64,
    start_time: String,
    end_time: String,
    duration_hours: f64,
}

impl TimeEntryRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            task_id: row.get(1)?,
            user_id: row.get(2)?,
            start_time: row.get(3)?,
            end_time: row.get(4)?,
            duration_hours: row.get(5)?,
        })
    }
}

impl TryFrom<TimeEntryRow> for TimeEntry {
    type Error = DbError;

    fn try_from(row: TimeEntryRow) -> Result<Self, Self::Error> {
        const TABLE: &str = "time_entries";
        Ok(Self {
            id: record_id(TABLE, row.id, row.id)?,
            task_id: record_id(TABLE, row.id, row.task_id)?,
            user_id: record_id(TABLE, row.id, row.user_id)?,
            start_time: parse_timestamp(&row.start_time, TABLE, row.id)?,
            end_time: parse_timestamp(&row.end_time, TABLE, row.id)?,
            duration_hours: row.duration_hours,
        })
    }
}

#[derive(Debug)]
struct TaskRow {
    id: i64,
    client_id: i64,
    title: String,
    description: Option<String>,
    assigned_to_id: i64,
    status: String,
    due_date: Option<String>,
    assignment_date: String,
}

impl TaskRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            client_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            assigned_to_id: row.get(4)?,
            status: row.get(5)?,
            due_date: row.get(6)?,
            assignment_date: row.get(7)?,
        })
    }
}

impl TryFrom<TaskRow> for Task {
    type Error = DbError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        const TABLE: &str = "tasks";
        Ok(Self {
            id: record_id(TABLE, row.id, row.id)?,
            client_id: record_id(TABLE, row.id, row.client_id)?,
            title: row.title,
            description: row.description,
            assigned_to_id: record_id(TABLE, row.id, row.assigned_to_id)?,
            status: row
                .status
                .parse()
                .map_err(|source| invalid_row(TABLE, row.id, source))?,
            due_date: row
                .due_date
                .as_deref()
                .map(|due| parse_timestamp(due, TABLE, row.id))
                .transpose()?,
            assignment_date: parse_timestamp(&row.assignment_date, TABLE, row.id)?,
        })
    }
}

fn record_id<T>(table: &'static str, row_id: i64, value: i64) -> Result<T, DbError>
where
    T: TryFrom<i64, Error = ValidationError>,
{
    T::try_from(value).map_err(|source| invalid_row(table, row_id, source))
}

const fn invalid_row(table: &'static str, id: i64, source: ValidationError) -> DbError {
    DbError::InvalidRow { table, id, source }
}

fn parse_timestamp(
    timestamp: &str,
    table: &'static str,
    id: i64,
) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            table,
            id,
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Formats an inclusive lower bound, rounding sub-millisecond values up so
/// that no stored timestamp before `from` compares as inside the range.
fn format_lower_bound(from: DateTime<Utc>) -> String {
    let floor = truncate_to_millis(from);
    if floor < from {
        format_timestamp(floor + Duration::milliseconds(1))
    } else {
        format_timestamp(floor)
    }
}

fn store_error(
    collection: Collection,
    operation: StoreOperation,
) -> impl FnOnce(DbError) -> StoreError {
    move |err| StoreError::new(collection, operation, err)
}

impl TimeEntryStore for Database {
    fn insert_time_entry(&mut self, draft: &TimeEntryDraft) -> Result<TimeEntry, StoreError> {
        self.insert_time_entry_row(draft)
            .map_err(store_error(Collection::TimeEntries, StoreOperation::Insert))
    }

    fn select_time_entries(
        &self,
        filter: &TimeEntryFilter,
    ) -> Result<Vec<TimeEntry>, StoreError> {
        self.time_entry_rows(filter)
            .map_err(store_error(Collection::TimeEntries, StoreOperation::Select))
    }

    fn find_time_entry(&self, id: TimeEntryId) -> Result<Option<TimeEntry>, StoreError> {
        self.time_entry_row(id)
            .map_err(store_error(Collection::TimeEntries, StoreOperation::Select))
    }

    fn update_time_entry(
        &mut self,
        id: TimeEntryId,
        changes: &TimeEntryChanges,
    ) -> Result<Option<TimeEntry>, StoreError> {
        self.update_time_entry_row(id, changes)
            .map_err(store_error(Collection::TimeEntries, StoreOperation::Update))
    }

    fn delete_time_entry(&mut self, id: TimeEntryId) -> Result<bool, StoreError> {
        self.delete_row("time_entries", id.get())
            .map_err(store_error(Collection::TimeEntries, StoreOperation::Delete))
    }
}

impl TaskStore for Database {
    fn insert_task(&mut self, draft: &TaskDraft) -> Result<Task, StoreError> {
        self.insert_task_row(draft)
            .map_err(store_error(Collection::Tasks, StoreOperation::Insert))
    }

    fn select_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError> {
        self.task_rows(filter)
            .map_err(store_error(Collection::Tasks, StoreOperation::Select))
    }

    fn find_task(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        self.task_row(id)
            .map_err(store_error(Collection::Tasks, StoreOperation::Select))
    }

    fn update_task(&mut self, id: TaskId, patch: &TaskPatch) -> Result<Option<Task>, StoreError> {
        self.update_task_row(id, patch)
            .map_err(store_error(Collection::Tasks, StoreOperation::Update))
    }

    fn delete_task(&mut self, id: TaskId) -> Result<bool, StoreError> {
        self.delete_row("tasks", id.get())
            .map_err(store_error(Collection::Tasks, StoreOperation::Delete))
    }
}

impl ClientStore for Database {
    fn insert_client(&mut self, client: &NewClient) -> Result<Client, StoreError> {
        self.insert_client_row(client)
            .map_err(store_error(Collection::Clients, StoreOperation::Insert))
    }

    fn select_clients(&self) -> Result<Vec<Client>, StoreError> {
        self.client_rows(None)
            .map_err(store_error(Collection::Clients, StoreOperation::Select))
    }

    fn find_client(&self, id: ClientId) -> Result<Option<Client>, StoreError> {
        self.client_rows(Some(id))
            .map(|mut clients| clients.pop())
            .map_err(store_error(Collection::Clients, StoreOperation::Select))
    }

    fn update_client(
        &mut self,
        id: ClientId,
        patch: &ClientPatch,
    ) -> Result<Option<Client>, StoreError> {
        self.update_client_row(id, patch)
            .map_err(store_error(Collection::Clients, StoreOperation::Update))
    }

    fn delete_client(&mut self, id: ClientId) -> Result<bool, StoreError> {
        self.delete_row("clients", id.get())
            .map_err(store_error(Collection::Clients, StoreOperation::Delete))
    }
}

impl UserStore for Database {
    fn insert_user(&mut self, user: &NewUser) -> Result<User, StoreError> {
        self.insert_user_row(user)
            .map_err(store_error(Collection::Users, StoreOperation::Insert))
    }

    fn select_users(&self) -> Result<Vec<User>, StoreError> {
        self.user_rows(None)
            .map_err(store_error(Collection::Users, StoreOperation::Select))
    }

    fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.user_rows(Some(username))
            .map(|mut users| users.pop())
            .map_err(store_error(Collection::Users, StoreOperation::Select))
    }
}
