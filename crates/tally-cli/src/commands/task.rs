//! Task management.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Subcommand;
use tally_core::access::{CLIENT_ADMINS, TASK_EDITORS};
use tally_core::model::{NewTask, TaskPatch};
use tally_core::tasks::{TaskSummary, create_task, delete_task, list_tasks, tasks_for_user, update_task};
use tally_core::users::find_user;
use tally_core::{Caller, ClientId, TaskId, TaskStatus, authorize};
use tally_db::Database;

use super::util::{DayBound, format_timestamp, parse_datetime, write_json, write_table};

#[derive(Debug, Subcommand)]
pub enum TaskAction {
    /// Create a task for a client.
    Add {
        /// Task title (3 to 255 characters).
        title: String,
        #[arg(long)]
        client: ClientId,
        #[arg(long)]
        description: Option<String>,
        /// Username to assign the task to. Defaults to yourself.
        #[arg(long)]
        assignee: Option<String>,
        /// Due date (RFC 3339, YYYY-MM-DD, or relative).
        #[arg(long)]
        due: Option<String>,
    },
    /// List all tasks.
    List {
        #[arg(long)]
        json: bool,
    },
    /// List tasks assigned to you.
    Mine {
        #[arg(long)]
        json: bool,
    },
    /// Change description, status or due date.
    Update {
        id: TaskId,
        #[arg(long)]
        description: Option<String>,
        /// pending, in_progress or completed.
        #[arg(long)]
        status: Option<TaskStatus>,
        #[arg(long)]
        due: Option<String>,
    },
    /// Delete a task and its time entries.
    Delete { id: TaskId },
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    caller: &Caller,
    action: &TaskAction,
) -> Result<()> {
    match action {
        TaskAction::Add {
            title,
            client,
            description,
            assignee,
            due,
        } => {
            authorize(caller, TASK_EDITORS)?;
            let assigned_to_id = match assignee.as_deref() {
                Some(username) => {
                    find_user(db, username)?
                        .with_context(|| format!("user {username} is not registered"))?
                        .id
                }
                None => caller.user_id,
            };
            let due_date = due
                .as_deref()
                .map(|due| parse_datetime(due, DayBound::End))
                .transpose()?;
            let task = create_task(
                db,
                &NewTask {
                    client_id: *client,
                    title: title.clone(),
                    description: description.clone(),
                    assigned_to_id,
                    due_date,
                },
            )?;
            writeln!(
                writer,
                "Created task {}: {} (client {})",
                task.id, task.title, task.client_id
            )?;
        }
        TaskAction::List { json } => {
            let tasks = list_tasks(db)?;
            write_tasks(writer, &tasks, *json)?;
        }
        TaskAction::Mine { json } => {
            let tasks = tasks_for_user(db, caller.user_id)?;
            write_tasks(writer, &tasks, *json)?;
        }
        TaskAction::Update {
            id,
            description,
            status,
            due,
        } => {
            authorize(caller, TASK_EDITORS)?;
            let patch = TaskPatch {
                description: description.clone(),
                status: *status,
                due_date: due
                    .as_deref()
                    .map(|due| parse_datetime(due, DayBound::End))
                    .transpose()?,
            };
            let task = update_task(db, *id, &patch)?;
            writeln!(writer, "Updated task {}: {}", task.id, task.status)?;
        }
        TaskAction::Delete { id } => {
            authorize(caller, CLIENT_ADMINS)?;
            let summary = delete_task(db, *id)?;
            writeln!(
                writer,
                "Deleted task {id} ({} time entries)",
                summary.time_entries_deleted
            )?;
        }
    }
    Ok(())
}

fn write_tasks<W: Write>(writer: &mut W, tasks: &[TaskSummary], json: bool) -> Result<()> {
    if json {
        return write_json(writer, tasks);
    }
    if tasks.is_empty() {
        writeln!(writer, "No tasks.")?;
        return Ok(());
    }
    let rows: Vec<Vec<String>> = tasks
        .iter()
        .map(|task| {
            vec![
                task.id.to_string(),
                task.title.clone(),
                task.status.to_string(),
                task.client.clone(),
                task.assigned_to.clone(),
                task.due_date.map(format_timestamp).unwrap_or_default(),
            ]
        })
        .collect();
    write_table(
        writer,
        &["ID", "TITLE", "STATUS", "CLIENT", "ASSIGNED", "DUE"],
        &rows,
        &[0],
    )
}
