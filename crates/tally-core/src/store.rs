//! Record store seams.
//!
//! Persistence lives outside this crate. Each collection (`time_entries`,
//! `tasks`, `clients`, `users`) is reached through a trait offering insert,
//! filtered select, partial update and delete. Every operation yields a single
//! typed `Result<_, StoreError>`; callers never inspect payloads for error
//! markers.
//!
//! A store is expected to make each individual call atomic. Nothing here
//! assumes multi-collection transactions.

use std::error::Error as StdError;
use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{
    Client, ClientPatch, NewClient, NewUser, Task, TaskDraft, TaskPatch, TimeEntry,
    TimeEntryChanges, TimeEntryDraft, User,
};
use crate::types::{ClientId, TaskId, TimeEntryId, UserId};

/// Named collection in the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    TimeEntries,
    Tasks,
    Clients,
    Users,
}

impl Collection {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TimeEntries => "time_entries",
            Self::Tasks => "tasks",
            Self::Clients => "clients",
            Self::Users => "users",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    Insert,
    Select,
    Update,
    Delete,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Insert => "insert",
            Self::Select => "select",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        write!(f, "{s}")
    }
}

/// A store call failed. The underlying error is kept as the source.
#[derive(Debug, Error)]
#[error("{operation} on {collection} failed: {source}")]
pub struct StoreError {
    pub collection: Collection,
    pub operation: StoreOperation,
    #[source]
    pub source: Box<dyn StdError + Send + Sync>,
}

impl StoreError {
    pub fn new(
        collection: Collection,
        operation: StoreOperation,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self {
            collection,
            operation,
            source: source.into(),
        }
    }
}

/// Select predicates for time entries. Unset fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeEntryFilter {
    /// `start_time >= value`
    pub start_from: Option<DateTime<Utc>>,
    /// `start_time <= value`
    pub start_until: Option<DateTime<Utc>>,
    /// `end_time <= value`
    pub end_until: Option<DateTime<Utc>>,
    pub task_id: Option<TaskId>,
    pub user_id: Option<UserId>,
}

impl TimeEntryFilter {
    pub fn all() -> Self {
        Self::default()
    }

    /// Entries lying entirely inside `[start, end]`.
    pub fn within(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start_from: Some(start),
            end_until: Some(end),
            ..Self::default()
        }
    }

    /// Entries whose start falls inside `[start, end]`.
    pub fn starting_between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start_from: Some(start),
            start_until: Some(end),
            ..Self::default()
        }
    }

    pub fn for_task(task_id: TaskId) -> Self {
        Self {
            task_id: Some(task_id),
            ..Self::default()
        }
    }

    /// Evaluates the predicates against an entry.
    pub fn matches(&self, entry: &TimeEntry) -> bool {
        self.start_from.is_none_or(|from| entry.start_time >= from)
            && self.start_until.is_none_or(|until| entry.start_time <= until)
            && self.end_until.is_none_or(|until| entry.end_time <= until)
            && self.task_id.is_none_or(|id| entry.task_id == id)
            && self.user_id.is_none_or(|id| entry.user_id == id)
    }
}

/// Select predicates for tasks. Unset fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub client_id: Option<ClientId>,
    pub assigned_to_id: Option<UserId>,
}

impl TaskFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_client(client_id: ClientId) -> Self {
        Self {
            client_id: Some(client_id),
            ..Self::default()
        }
    }

    pub fn assigned_to(user_id: UserId) -> Self {
        Self {
            assigned_to_id: Some(user_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        self.client_id.is_none_or(|id| task.client_id == id)
            && self.assigned_to_id.is_none_or(|id| task.assigned_to_id == id)
    }
}

/// The `time_entries` collection.
///
/// Selects return entries ordered by `start_time`, then `id`.
pub trait TimeEntryStore {
    fn insert_time_entry(&mut self, draft: &TimeEntryDraft) -> Result<TimeEntry, StoreError>;

    fn select_time_entries(&self, filter: &TimeEntryFilter)
    -> Result<Vec<TimeEntry>, StoreError>;

    fn find_time_entry(&self, id: TimeEntryId) -> Result<Option<TimeEntry>, StoreError>;

    /// Returns `None` when no entry has this id.
    fn update_time_entry(
        &mut self,
        id: TimeEntryId,
        changes: &TimeEntryChanges,
    ) -> Result<Option<TimeEntry>, StoreError>;

    /// Returns whether a row was removed.
    fn delete_time_entry(&mut self, id: TimeEntryId) -> Result<bool, StoreError>;
}

/// The `tasks` collection. Selects are ordered by `id`.
pub trait TaskStore {
    fn insert_task(&mut self, draft: &TaskDraft) -> Result<Task, StoreError>;

    fn select_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError>;

    fn find_task(&self, id: TaskId) -> Result<Option<Task>, StoreError>;

    fn update_task(&mut self, id: TaskId, patch: &TaskPatch) -> Result<Option<Task>, StoreError>;

    fn delete_task(&mut self, id: TaskId) -> Result<bool, StoreError>;
}

/// The `clients` collection. Selects are ordered by `id`.
pub trait ClientStore {
    fn insert_client(&mut self, client: &NewClient) -> Result<Client, StoreError>;

    fn select_clients(&self) -> Result<Vec<Client>, StoreError>;

    fn find_client(&self, id: ClientId) -> Result<Option<Client>, StoreError>;

    fn update_client(
        &mut self,
        id: ClientId,
        patch: &ClientPatch,
    ) -> Result<Option<Client>, StoreError>;

    fn delete_client(&mut self, id: ClientId) -> Result<bool, StoreError>;
}

/// The `users` collection. Selects are ordered by `id`.
pub trait UserStore {
    fn insert_user(&mut self, user: &NewUser) -> Result<User, StoreError>;

    fn select_users(&self) -> Result<Vec<User>, StoreError>;

    fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
}

/// A store providing every collection.
pub trait RecordStore: TimeEntryStore + TaskStore + ClientStore + UserStore {}

impl<T> RecordStore for T where T: TimeEntryStore + TaskStore + ClientStore + UserStore {}
