//! Time entry operations.
//!
//! Every write goes through [`TimeInterval`] validation, so a stored entry
//! always has `start_time < end_time` and a duration derived from its bounds.

use crate::error::TrackerError;
use crate::interval::TimeInterval;
use crate::model::{NewTimeEntry, TimeEntry, TimeEntryChanges, TimeEntryDraft, TimeEntryPatch};
use crate::store::{TimeEntryFilter, TimeEntryStore};
use crate::types::{TimeEntryId, UserId};

/// Records time against a task for `user_id`.
pub fn create_time_entry<S: TimeEntryStore + ?Sized>(
    store: &mut S,
    user_id: UserId,
    new: &NewTimeEntry,
) -> Result<TimeEntry, TrackerError> {
    let interval = TimeInterval::new(new.start_time, new.end_time)?;
    let draft = TimeEntryDraft::new(new.task_id, user_id, interval);
    let entry = store.insert_time_entry(&draft)?;
    tracing::debug!(
        entry_id = %entry.id,
        task_id = %entry.task_id,
        hours = entry.duration_hours,
        "time entry created"
    );
    Ok(entry)
}

pub fn list_time_entries<S: TimeEntryStore + ?Sized>(
    store: &S,
) -> Result<Vec<TimeEntry>, TrackerError> {
    Ok(store.select_time_entries(&TimeEntryFilter::all())?)
}

pub fn get_time_entry<S: TimeEntryStore + ?Sized>(
    store: &S,
    id: TimeEntryId,
) -> Result<TimeEntry, TrackerError> {
    store
        .find_time_entry(id)?
        .ok_or_else(|| TrackerError::time_entry_not_found(id))
}

/// Applies a partial update.
///
/// When either bound changes, the resulting pair (stored value for the
/// untouched bound) is validated and the duration recomputed.
pub fn update_time_entry<S: TimeEntryStore + ?Sized>(
    store: &mut S,
    id: TimeEntryId,
    patch: &TimeEntryPatch,
) -> Result<TimeEntry, TrackerError> {
    let current = get_time_entry(&*store, id)?;

    let interval = if patch.touches_interval() {
        let stored = TimeInterval::new(current.start_time, current.end_time)?;
        Some(TimeInterval::effective(
            stored,
            patch.start_time,
            patch.end_time,
        )?)
    } else {
        None
    };

    let changes = TimeEntryChanges::new(patch.task_id, interval);
    if changes.is_empty() {
        return Ok(current);
    }

    let updated = store
        .update_time_entry(id, &changes)?
        .ok_or_else(|| TrackerError::time_entry_not_found(id))?;
    tracing::debug!(entry_id = %id, hours = updated.duration_hours, "time entry updated");
    Ok(updated)
}

/// Deletes one entry. No other record is touched.
pub fn delete_time_entry<S: TimeEntryStore + ?Sized>(
    store: &mut S,
    id: TimeEntryId,
) -> Result<(), TrackerError> {
    if store.delete_time_entry(id)? {
        tracing::debug!(entry_id = %id, "time entry deleted");
        Ok(())
    } else {
        Err(TrackerError::time_entry_not_found(id))
    }
}
