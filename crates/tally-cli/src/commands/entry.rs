//! Recording and editing time entries.

use std::io::Write;

use anyhow::Result;
use clap::Subcommand;
use tally_core::entries::{
    create_time_entry, delete_time_entry, get_time_entry, list_time_entries, update_time_entry,
};
use tally_core::model::{NewTimeEntry, TimeEntryPatch};
use tally_core::{Caller, TaskId, TimeEntry, TimeEntryId};
use tally_db::Database;

use super::util::{DayBound, format_timestamp, parse_datetime, write_json, write_table};

#[derive(Debug, Subcommand)]
pub enum EntryAction {
    /// Record time against a task.
    Add {
        #[arg(long)]
        task: TaskId,
        /// Start time (RFC 3339, YYYY-MM-DD, or relative like "2 hours ago").
        #[arg(long)]
        start: String,
        /// End time.
        #[arg(long)]
        end: String,
    },
    /// List all time entries.
    List {
        #[arg(long)]
        json: bool,
    },
    /// Show one time entry as JSON.
    Show { id: TimeEntryId },
    /// Move an entry to another task or change its bounds.
    Update {
        id: TimeEntryId,
        #[arg(long)]
        task: Option<TaskId>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },
    Delete { id: TimeEntryId },
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    caller: &Caller,
    action: &EntryAction,
) -> Result<()> {
    match action {
        EntryAction::Add { task, start, end } => {
            let new = NewTimeEntry {
                task_id: *task,
                start_time: parse_datetime(start, DayBound::Start)?,
                end_time: parse_datetime(end, DayBound::End)?,
            };
            let entry = create_time_entry(db, caller.user_id, &new)?;
            writeln!(
                writer,
                "Recorded {:.2} h on task {} (entry {})",
                entry.duration_hours, entry.task_id, entry.id
            )?;
        }
        EntryAction::List { json } => {
            let entries = list_time_entries(db)?;
            write_entries(writer, &entries, *json)?;
        }
        EntryAction::Show { id } => {
            let entry = get_time_entry(db, *id)?;
            write_json(writer, &entry)?;
        }
        EntryAction::Update {
            id,
            task,
            start,
            end,
        } => {
            let patch = TimeEntryPatch {
                task_id: *task,
                start_time: start
                    .as_deref()
                    .map(|s| parse_datetime(s, DayBound::Start))
                    .transpose()?,
                end_time: end
                    .as_deref()
                    .map(|s| parse_datetime(s, DayBound::End))
                    .transpose()?,
            };
            let entry = update_time_entry(db, *id, &patch)?;
            writeln!(
                writer,
                "Updated entry {}: {:.2} h",
                entry.id, entry.duration_hours
            )?;
        }
        EntryAction::Delete { id } => {
            delete_time_entry(db, *id)?;
            writeln!(writer, "Deleted entry {id}")?;
        }
    }
    Ok(())
}

fn write_entries<W: Write>(writer: &mut W, entries: &[TimeEntry], json: bool) -> Result<()> {
    if json {
        return write_json(writer, entries);
    }
    if entries.is_empty() {
        writeln!(writer, "No time entries.")?;
        return Ok(());
    }
    let rows: Vec<Vec<String>> = entries
        .iter()
        .map(|entry| {
            vec![
                entry.id.to_string(),
                entry.task_id.to_string(),
                format_timestamp(entry.start_time),
                format_timestamp(entry.end_time),
                format!("{:.2}", entry.duration_hours),
            ]
        })
        .collect();
    write_table(
        writer,
        &["ID", "TASK", "START", "END", "HOURS"],
        &rows,
        &[0, 1, 4],
    )
}
