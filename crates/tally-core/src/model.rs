//! Stored records and the inputs used to create or change them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::access::Role;
use crate::interval::TimeInterval;
use crate::types::{ClientId, TaskId, TaskStatus, TimeEntryId, UserId};

/// A recorded interval of work against one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: TimeEntryId,
    pub task_id: TaskId,
    pub user_id: UserId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Always `end_time - start_time` in hours, unrounded.
    pub duration_hours: f64,
}

/// A unit of work for a client, assigned to one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub client_id: ClientId,
    pub title: String,
    pub description: Option<String>,
    pub assigned_to_id: UserId,
    pub status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub assignment_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    pub color: String,
}

/// A registered user that tasks are assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub role: Role,
}

/// Caller input for recording time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewTimeEntry {
    pub task_id: TaskId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Partial update of a time entry. `None` leaves the field untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeEntryPatch {
    pub task_id: Option<TaskId>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl TimeEntryPatch {
    pub const fn touches_interval(&self) -> bool {
        self.start_time.is_some() || self.end_time.is_some()
    }
}

/// A validated time entry ready to be inserted.
///
/// Only constructible from a [`TimeInterval`], so the stored duration always
/// matches the bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeEntryDraft {
    task_id: TaskId,
    user_id: UserId,
    interval: TimeInterval,
}

impl TimeEntryDraft {
    pub(crate) const fn new(task_id: TaskId, user_id: UserId, interval: TimeInterval) -> Self {
        Self {
            task_id,
            user_id,
            interval,
        }
    }

    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    pub const fn start_time(&self) -> DateTime<Utc> {
        self.interval.start()
    }

    pub const fn end_time(&self) -> DateTime<Utc> {
        self.interval.end()
    }

    pub fn duration_hours(&self) -> f64 {
        self.interval.hours()
    }
}

/// Validated column changes for a stored time entry.
///
/// Bounds are always written together with the recomputed duration.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimeEntryChanges {
    task_id: Option<TaskId>,
    interval: Option<TimeInterval>,
}

impl TimeEntryChanges {
    pub(crate) const fn new(task_id: Option<TaskId>, interval: Option<TimeInterval>) -> Self {
        Self { task_id, interval }
    }

    pub const fn task_id(&self) -> Option<TaskId> {
        self.task_id
    }

    /// New `(start, end, duration_hours)`, when the bounds change.
    pub fn bounds(&self) -> Option<(DateTime<Utc>, DateTime<Utc>, f64)> {
        self.interval
            .map(|interval| (interval.start(), interval.end(), interval.hours()))
    }

    pub const fn is_empty(&self) -> bool {
        self.task_id.is_none() && self.interval.is_none()
    }
}

/// Caller input for creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub client_id: ClientId,
    pub title: String,
    pub description: Option<String>,
    pub assigned_to_id: UserId,
    pub due_date: Option<DateTime<Utc>>,
}

/// A validated task ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub client_id: ClientId,
    pub title: String,
    pub description: Option<String>,
    pub assigned_to_id: UserId,
    pub status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub assignment_date: DateTime<Utc>,
}

/// Partial update of a task. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<DateTime<Utc>>,
}

impl TaskPatch {
    pub const fn is_empty(&self) -> bool {
        self.description.is_none() && self.status.is_none() && self.due_date.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewClient {
    pub name: String,
    pub color: String,
}

/// Partial update of a client. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientPatch {
    pub name: Option<String>,
    pub color: Option<String>,
}

impl ClientPatch {
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.color.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub role: Role,
}
