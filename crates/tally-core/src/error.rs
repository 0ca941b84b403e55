//! Error taxonomy surfaced by the services and the report engine.

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::access::Role;
use crate::interval::InvalidInterval;
use crate::store::StoreError;
use crate::types::{ClientId, TaskId, TimeEntryId, ValidationError};

/// Errors returned by tracker operations.
///
/// Each variant has a stable [`kind`](TrackerError::kind) for programmatic
/// handling and a human-readable message.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// A time entry's start was not before its end.
    #[error(transparent)]
    InvalidInterval(#[from] InvalidInterval),

    /// The report window holds no time entries.
    #[error("no time entries between {start} and {end}")]
    NoDataInRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("client {0} not found")]
    ClientNotFound(ClientId),

    #[error("client {0} has no tasks")]
    NoTasksForClient(ClientId),

    /// A record looked up by id does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("user {username} with role {role} is not allowed to perform this operation")]
    Unauthorized { username: String, role: Role },

    /// The record store reported a failure. Never retried.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A cascade delete stopped after some of its steps had already been applied.
    #[error("cascade delete stopped at {step} after {completed} completed step(s): {source}")]
    PartialCascadeFailure {
        step: CascadeStep,
        completed: usize,
        #[source]
        source: StoreError,
    },
}

impl TrackerError {
    /// Stable identifier of the error kind.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInterval(_) => "invalid_interval",
            Self::NoDataInRange { .. } => "no_data_in_range",
            Self::ClientNotFound(_) => "client_not_found",
            Self::NoTasksForClient(_) => "no_tasks_for_client",
            Self::NotFound { .. } => "not_found",
            Self::Validation(_) => "validation",
            Self::Unauthorized { .. } => "unauthorized",
            Self::Store(_) => "store_failure",
            Self::PartialCascadeFailure { .. } => "partial_cascade_failure",
        }
    }

    pub(crate) const fn time_entry_not_found(id: TimeEntryId) -> Self {
        Self::NotFound {
            entity: "time entry",
            id: id.get(),
        }
    }

    pub(crate) const fn task_not_found(id: TaskId) -> Self {
        Self::NotFound {
            entity: "task",
            id: id.get(),
        }
    }

    pub(crate) const fn client_not_found(id: ClientId) -> Self {
        Self::NotFound {
            entity: "client",
            id: id.get(),
        }
    }
}

/// One store call within a cascade delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeStep {
    ListTasks(ClientId),
    ListTimeEntries(TaskId),
    DeleteTimeEntry { entry: TimeEntryId, task: TaskId },
    DeleteTask(TaskId),
    DeleteClient(ClientId),
}

impl fmt::Display for CascadeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ListTasks(client) => write!(f, "list tasks of client {client}"),
            Self::ListTimeEntries(task) => write!(f, "list time entries of task {task}"),
            Self::DeleteTimeEntry { entry, task } => {
                write!(f, "delete time entry {entry} of task {task}")
            }
            Self::DeleteTask(task) => write!(f, "delete task {task}"),
            Self::DeleteClient(client) => write!(f, "delete client {client}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Collection, StoreOperation};

    #[test]
    fn partial_cascade_message_names_the_step() {
        let err = TrackerError::PartialCascadeFailure {
            step: CascadeStep::DeleteTask(TaskId::new(7).unwrap()),
            completed: 4,
            source: StoreError::new(Collection::Tasks, StoreOperation::Delete, "locked"),
        };
        assert_eq!(err.kind(), "partial_cascade_failure");
        assert_eq!(
            err.to_string(),
            "cascade delete stopped at delete task 7 after 4 completed step(s): delete on tasks failed: locked"
        );
    }

    #[test]
    fn store_failure_is_transparent() {
        let err: TrackerError =
            StoreError::new(Collection::Clients, StoreOperation::Select, "timeout").into();
        assert_eq!(err.kind(), "store_failure");
        assert_eq!(err.to_string(), "select on clients failed: timeout");
    }

    #[test]
    fn validation_kind() {
        let err: TrackerError = ValidationError::TitleLength { len: 2 }.into();
        assert_eq!(err.kind(), "validation");
    }
}
