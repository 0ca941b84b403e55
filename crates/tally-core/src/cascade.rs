//! Cascade deletes: client → tasks → time entries.
//!
//! The store only guarantees atomicity per call, so a cascade is a sequence
//! of independent calls. Children go first. When a call fails after earlier
//! calls already changed data, the error is
//! [`TrackerError::PartialCascadeFailure`] naming the failed step; nothing is
//! rolled back or retried. A failure before any change surfaces as a plain
//! store failure.

use serde::Serialize;

use crate::error::{CascadeStep, TrackerError};
use crate::store::{
    ClientStore, StoreError, TaskFilter, TaskStore, TimeEntryFilter, TimeEntryStore,
};
use crate::types::{ClientId, TaskId};

/// What a cascade delete removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CascadeSummary {
    pub clients_deleted: usize,
    pub tasks_deleted: usize,
    pub time_entries_deleted: usize,
}

/// Tracks completed steps so failures can be classified.
#[derive(Debug, Default)]
struct Cascade {
    completed: usize,
    summary: CascadeSummary,
}

impl Cascade {
    fn step<T>(
        &self,
        step: CascadeStep,
        result: Result<T, StoreError>,
    ) -> Result<T, TrackerError> {
        match result {
            Ok(value) => Ok(value),
            Err(source) if self.completed == 0 => Err(source.into()),
            Err(source) => {
                tracing::warn!(
                    %step,
                    completed = self.completed,
                    error = %source,
                    "cascade delete stopped partway"
                );
                Err(TrackerError::PartialCascadeFailure {
                    step,
                    completed: self.completed,
                    source,
                })
            }
        }
    }

    fn delete_task<S>(&mut self, store: &mut S, task: TaskId) -> Result<(), TrackerError>
    where
        S: TaskStore + TimeEntryStore + ?Sized,
    {
        let entries = self.step(
            CascadeStep::ListTimeEntries(task),
            store.select_time_entries(&TimeEntryFilter::for_task(task)),
        )?;
        for entry in entries {
            let removed = self.step(
                CascadeStep::DeleteTimeEntry {
                    entry: entry.id,
                    task,
                },
                store.delete_time_entry(entry.id),
            )?;
            self.completed += 1;
            if removed {
                self.summary.time_entries_deleted += 1;
            }
        }

        let removed = self.step(CascadeStep::DeleteTask(task), store.delete_task(task))?;
        self.completed += 1;
        if removed {
            self.summary.tasks_deleted += 1;
        }
        Ok(())
    }
}

/// Deletes a task and all of its time entries.
pub fn delete_task<S>(store: &mut S, task: TaskId) -> Result<CascadeSummary, TrackerError>
where
    S: TaskStore + TimeEntryStore + ?Sized,
{
    if store.find_task(task)?.is_none() {
        return Err(TrackerError::task_not_found(task));
    }

    let mut cascade = Cascade::default();
    cascade.delete_task(store, task)?;
    tracing::info!(
        task_id = %task,
        time_entries = cascade.summary.time_entries_deleted,
        "task deleted"
    );
    Ok(cascade.summary)
}

/// Deletes a client, its tasks and their time entries.
pub fn delete_client<S>(store: &mut S, client: ClientId) -> Result<CascadeSummary, TrackerError>
where
    S: ClientStore + TaskStore + TimeEntryStore + ?Sized,
{
    if store.find_client(client)?.is_none() {
        return Err(TrackerError::client_not_found(client));
    }

    let mut cascade = Cascade::default();
    let tasks = cascade.step(
        CascadeStep::ListTasks(client),
        store.select_tasks(&TaskFilter::for_client(client)),
    )?;
    for task in tasks {
        cascade.delete_task(store, task.id)?;
    }

    let removed = cascade.step(CascadeStep::DeleteClient(client), store.delete_client(client))?;
    if removed {
        cascade.summary.clients_deleted += 1;
    }
    tracing::info!(
        client_id = %client,
        tasks = cascade.summary.tasks_deleted,
        time_entries = cascade.summary.time_entries_deleted,
        "client deleted"
    );
    Ok(cascade.summary)
}
