//! Task operations.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::TrackerError;
use crate::model::{NewTask, Task, TaskDraft, TaskPatch};
use crate::store::{ClientStore, TaskFilter, TaskStore, UserStore};
use crate::types::{ClientId, TaskId, TaskStatus, UserId, ValidationError};

pub use crate::cascade::delete_task;

const TITLE_MIN: usize = 3;
const TITLE_MAX: usize = 255;

/// Shown when a task's client no longer exists.
pub const NO_CLIENT: &str = "No client";
/// Shown when a task's assignee no longer exists.
pub const UNASSIGNED: &str = "Unassigned";

/// A task with its client and assignee resolved to names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskSummary {
    pub id: TaskId,
    pub title: String,
    pub status: TaskStatus,
    pub client_id: ClientId,
    pub client: String,
    pub assigned_to: String,
    pub due_date: Option<DateTime<Utc>>,
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
    let len = title.chars().count();
    if (TITLE_MIN..=TITLE_MAX).contains(&len) {
        Ok(())
    } else {
        Err(ValidationError::TitleLength { len })
    }
}

/// Creates a pending task assigned now.
pub fn create_task<S: TaskStore + ?Sized>(
    store: &mut S,
    new: &NewTask,
) -> Result<Task, TrackerError> {
    create_task_at(store, new, Utc::now())
}

/// Creates a pending task with an explicit assignment date.
pub fn create_task_at<S: TaskStore + ?Sized>(
    store: &mut S,
    new: &NewTask,
    assigned_at: DateTime<Utc>,
) -> Result<Task, TrackerError> {
    validate_title(&new.title)?;
    let draft = TaskDraft {
        client_id: new.client_id,
        title: new.title.clone(),
        description: new.description.clone(),
        assigned_to_id: new.assigned_to_id,
        status: TaskStatus::Pending,
        due_date: new.due_date,
        assignment_date: assigned_at,
    };
    let task = store.insert_task(&draft)?;
    tracing::debug!(task_id = %task.id, client_id = %task.client_id, "task created");
    Ok(task)
}

/// Lists every task with client and assignee names.
pub fn list_tasks<S>(store: &S) -> Result<Vec<TaskSummary>, TrackerError>
where
    S: TaskStore + ClientStore + UserStore + ?Sized,
{
    summarize(store, &TaskFilter::all())
}

/// Lists the tasks assigned to one user.
pub fn tasks_for_user<S>(store: &S, user_id: UserId) -> Result<Vec<TaskSummary>, TrackerError>
where
    S: TaskStore + ClientStore + UserStore + ?Sized,
{
    summarize(store, &TaskFilter::assigned_to(user_id))
}

fn summarize<S>(store: &S, filter: &TaskFilter) -> Result<Vec<TaskSummary>, TrackerError>
where
    S: TaskStore + ClientStore + UserStore + ?Sized,
{
    let tasks = store.select_tasks(filter)?;
    let clients: HashMap<ClientId, String> = store
        .select_clients()?
        .into_iter()
        .map(|client| (client.id, client.name))
        .collect();
    let users: HashMap<UserId, String> = store
        .select_users()?
        .into_iter()
        .map(|user| (user.id, user.username))
        .collect();

    Ok(tasks
        .into_iter()
        .map(|task| TaskSummary {
            client: clients
                .get(&task.client_id)
                .map_or_else(|| NO_CLIENT.to_string(), Clone::clone),
            assigned_to: users
                .get(&task.assigned_to_id)
                .map_or_else(|| UNASSIGNED.to_string(), Clone::clone),
            id: task.id,
            title: task.title,
            status: task.status,
            client_id: task.client_id,
            due_date: task.due_date,
        })
        .collect())
}

pub fn get_task<S: TaskStore + ?Sized>(store: &S, id: TaskId) -> Result<Task, TrackerError> {
    store
        .find_task(id)?
        .ok_or_else(|| TrackerError::task_not_found(id))
}

/// Applies a partial update to description, status or due date.
pub fn update_task<S: TaskStore + ?Sized>(
    store: &mut S,
    id: TaskId,
    patch: &TaskPatch,
) -> Result<Task, TrackerError> {
    if patch.is_empty() {
        return get_task(&*store, id);
    }
    let task = store
        .update_task(id, patch)?
        .ok_or_else(|| TrackerError::task_not_found(id))?;
    tracing::debug!(task_id = %id, status = %task.status, "task updated");
    Ok(task)
}
