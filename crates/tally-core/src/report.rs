//! Hour report aggregation.
//!
//! Reports are built in two passes over the entries of an aggregation window:
//!
//! 1. Every entry whose task resolves adds its duration to its client's total
//!    and to the subtotal of the task's title. Entries pointing at unknown
//!    tasks are dropped and counted.
//! 2. Every task of a client already present gets a row, at zero hours if
//!    nothing was logged. Clients without entries in the window never get a
//!    row.
//!
//! Client and task order follows first appearance in the entry stream, which
//! the store yields ordered by start time. Hours stay unrounded in
//! [`ReportRow`]; serialization and rendering round to 2 decimals.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::TrackerError;
use crate::interval::{duration_hours, round_hours};
use crate::model::{Task, TimeEntry};
use crate::store::{ClientStore, TaskFilter, TaskStore, TimeEntryFilter, TimeEntryStore};
use crate::types::{ClientId, TaskId};

/// Report settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Name shown for a client id that does not resolve.
    pub unknown_client_name: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            unknown_client_name: "Unknown".to_string(),
        }
    }
}

/// Hours logged against one task title.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskHours {
    #[serde(rename = "Título")]
    pub title: String,
    #[serde(rename = "Horas", serialize_with = "rounded")]
    pub hours: f64,
}

/// One client's line in an hour report.
///
/// `total_hours` equals the sum of `tasks` before rounding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    #[serde(skip)]
    pub client_id: ClientId,
    #[serde(rename = "Cliente")]
    pub client_name: String,
    #[serde(rename = "Total Horas", serialize_with = "rounded")]
    pub total_hours: f64,
    #[serde(rename = "Tareas")]
    pub tasks: Vec<TaskHours>,
}

/// Hours one client accumulated on one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyClientHours {
    pub date: NaiveDate,
    pub client: String,
    #[serde(serialize_with = "rounded")]
    pub hours: f64,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn rounded<S: Serializer>(hours: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_hours(*hours))
}

#[derive(Debug, Default)]
struct ClientHours {
    total: f64,
    tasks: IndexMap<String, f64>,
}

impl ClientHours {
    fn add(&mut self, title: &str, hours: f64) {
        self.total += hours;
        *self.tasks.entry(title.to_string()).or_insert(0.0) += hours;
    }

    fn include(&mut self, title: &str) {
        self.tasks.entry(title.to_string()).or_insert(0.0);
    }
}

/// First pass: running sums per client and task title.
fn accumulate(
    entries: &[TimeEntry],
    tasks: &HashMap<TaskId, &Task>,
) -> IndexMap<ClientId, ClientHours> {
    let mut sums: IndexMap<ClientId, ClientHours> = IndexMap::new();
    let mut orphans = 0usize;

    for entry in entries {
        let Some(task) = tasks.get(&entry.task_id) else {
            orphans += 1;
            tracing::debug!(
                entry_id = %entry.id,
                task_id = %entry.task_id,
                "dropping time entry with unknown task"
            );
            continue;
        };
        sums.entry(task.client_id)
            .or_default()
            .add(&task.title, entry.duration_hours);
    }

    if orphans > 0 {
        tracing::debug!(orphans, "orphan time entries skipped");
    }
    sums
}

/// Second pass: every task of an included client gets a row.
fn zero_fill(sums: &mut IndexMap<ClientId, ClientHours>, tasks: &[Task]) {
    for task in tasks {
        if let Some(client) = sums.get_mut(&task.client_id) {
            client.include(&task.title);
        }
    }
}

fn client_names<S: ClientStore + ?Sized>(
    store: &S,
) -> Result<HashMap<ClientId, String>, TrackerError> {
    Ok(store
        .select_clients()?
        .into_iter()
        .map(|client| (client.id, client.name))
        .collect())
}

fn row(client_id: ClientId, client_name: String, hours: ClientHours) -> ReportRow {
    ReportRow {
        client_id,
        client_name,
        total_hours: hours.total,
        tasks: hours
            .tasks
            .into_iter()
            .map(|(title, hours)| TaskHours { title, hours })
            .collect(),
    }
}

/// Builds the per-client hour report for entries lying entirely inside
/// `[start, end]`.
///
/// # Errors
///
/// `NoDataInRange` when the window holds no entries at all. A window whose
/// entries are all orphans yields an empty report instead.
pub fn build_report<S>(
    store: &S,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    config: &ReportConfig,
) -> Result<Vec<ReportRow>, TrackerError>
where
    S: TimeEntryStore + TaskStore + ClientStore + ?Sized,
{
    let entries = store.select_time_entries(&TimeEntryFilter::within(start, end))?;
    if entries.is_empty() {
        return Err(TrackerError::NoDataInRange { start, end });
    }

    let tasks = store.select_tasks(&TaskFilter::all())?;
    let by_id: HashMap<TaskId, &Task> = tasks.iter().map(|task| (task.id, task)).collect();

    let mut sums = accumulate(&entries, &by_id);
    zero_fill(&mut sums, &tasks);

    let names = client_names(store)?;
    let rows: Vec<ReportRow> = sums
        .into_iter()
        .map(|(client_id, hours)| {
            let name = names
                .get(&client_id)
                .map_or_else(|| config.unknown_client_name.clone(), Clone::clone);
            row(client_id, name, hours)
        })
        .collect();
    tracing::debug!(entries = entries.len(), clients = rows.len(), "report built");
    Ok(rows)
}

/// Builds the hour report of a single client.
///
/// The client's row is always present, listing each of its tasks (at zero
/// hours when nothing was logged in the window).
///
/// # Errors
///
/// `ClientNotFound` for an unknown id, `NoDataInRange` when the window holds
/// no entries for any client, `NoTasksForClient` when the client owns no
/// tasks at all. The window is checked before the client's tasks, so an
/// empty window reports `NoDataInRange` even for a client without tasks.
pub fn build_client_report<S>(
    store: &S,
    client_id: ClientId,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<ReportRow, TrackerError>
where
    S: TimeEntryStore + TaskStore + ClientStore + ?Sized,
{
    let client = store
        .find_client(client_id)?
        .ok_or(TrackerError::ClientNotFound(client_id))?;

    let entries = store.select_time_entries(&TimeEntryFilter::within(start, end))?;
    if entries.is_empty() {
        return Err(TrackerError::NoDataInRange { start, end });
    }

    let tasks = store.select_tasks(&TaskFilter::for_client(client_id))?;
    if tasks.is_empty() {
        return Err(TrackerError::NoTasksForClient(client_id));
    }
    let by_id: HashMap<TaskId, &Task> = tasks.iter().map(|task| (task.id, task)).collect();

    let own: Vec<TimeEntry> = entries
        .into_iter()
        .filter(|entry| by_id.contains_key(&entry.task_id))
        .collect();

    let mut sums = accumulate(&own, &by_id);
    let mut hours = sums.swap_remove(&client_id).unwrap_or_default();
    for task in &tasks {
        hours.include(&task.title);
    }
    Ok(row(client_id, client.name, hours))
}

/// Sums hours per UTC calendar day and client for entries starting inside
/// `[start, end]`.
///
/// Durations are recomputed from the bounds. Days appear in chronological
/// order; clients within a day in order of first entry.
pub fn daily_client_hours<S>(
    store: &S,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    config: &ReportConfig,
) -> Result<Vec<DailyClientHours>, TrackerError>
where
    S: TimeEntryStore + TaskStore + ClientStore + ?Sized,
{
    let entries = store.select_time_entries(&TimeEntryFilter::starting_between(start, end))?;
    if entries.is_empty() {
        return Ok(Vec::new());
    }

    let tasks = store.select_tasks(&TaskFilter::all())?;
    let task_clients: HashMap<TaskId, ClientId> =
        tasks.iter().map(|task| (task.id, task.client_id)).collect();
    let names = client_names(store)?;

    let mut days: IndexMap<(NaiveDate, &str), f64> = IndexMap::new();
    for entry in &entries {
        let Some(client_id) = task_clients.get(&entry.task_id) else {
            tracing::debug!(entry_id = %entry.id, "dropping time entry with unknown task");
            continue;
        };
        let client = names
            .get(client_id)
            .map_or(config.unknown_client_name.as_str(), String::as_str);
        let day = entry.start_time.date_naive();
        *days.entry((day, client)).or_insert(0.0) +=
            duration_hours(entry.start_time, entry.end_time);
    }

    Ok(days
        .into_iter()
        .map(|((date, client), hours)| DailyClientHours {
            date,
            client: client.to_string(),
            hours,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{MemoryStore, at, on};
    use crate::store::{Collection, StoreOperation};

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        (at(0, 0), at(23, 59))
    }

    fn acme() -> (MemoryStore, ClientId, TaskId, TaskId) {
        let mut store = MemoryStore::new();
        let acme = store.add_client("Acme");
        let a = store.add_task(acme, "A");
        let b = store.add_task(acme, "B");
        store.add_entry(a, at(9, 0), at(11, 0));
        store.add_entry(a, at(11, 0), at(11, 30));
        store.add_entry(b, at(14, 0), at(15, 0));
        (store, acme, a, b)
    }

    fn hours(row: &ReportRow) -> Vec<(&str, f64)> {
        row.tasks
            .iter()
            .map(|task| (task.title.as_str(), task.hours))
            .collect()
    }

    #[test]
    fn acme_scenario_totals() {
        let (store, _, _, _) = acme();
        let (start, end) = window();

        let rows = build_report(&store, start, end, &ReportConfig::default()).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].client_name, "Acme");
        assert!((rows[0].total_hours - 3.5).abs() < 1e-9);
        assert_eq!(hours(&rows[0]), vec![("A", 2.5), ("B", 1.0)]);
    }

    #[test]
    fn report_json_uses_caller_keys() {
        let (store, _, _, _) = acme();
        let (start, end) = window();
        let rows = build_report(&store, start, end, &ReportConfig::default()).unwrap();

        insta::assert_snapshot!(serde_json::to_string_pretty(&rows).unwrap(), @r#"
        [
          {
            "Cliente": "Acme",
            "Total Horas": 3.5,
            "Tareas": [
              {
                "Título": "A",
                "Horas": 2.5
              },
              {
                "Título": "B",
                "Horas": 1.0
              }
            ]
          }
        ]
        "#);
    }

    #[test]
    fn tasks_without_hours_are_zero_filled() {
        let (mut store, acme, _, _) = acme();
        store.add_task(acme, "C");
        let (start, end) = window();

        let rows = build_report(&store, start, end, &ReportConfig::default()).unwrap();

        assert_eq!(hours(&rows[0]), vec![("A", 2.5), ("B", 1.0), ("C", 0.0)]);
    }

    #[test]
    fn clients_without_entries_get_no_row() {
        let (mut store, _, _, _) = acme();
        let idle = store.add_client("Idle");
        store.add_task(idle, "Nothing");
        let (start, end) = window();

        let rows = build_report(&store, start, end, &ReportConfig::default()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].client_name, "Acme");
    }

    #[test]
    fn orphan_entries_are_ignored() {
        let (mut store, _, _, _) = acme();
        store.add_entry(TaskId::new(999).unwrap(), at(12, 0), at(13, 0));
        let (start, end) = window();

        let rows = build_report(&store, start, end, &ReportConfig::default()).unwrap();
        assert!((rows[0].total_hours - 3.5).abs() < 1e-9);
    }

    #[test]
    fn only_orphans_yield_empty_report() {
        let mut store = MemoryStore::new();
        store.add_entry(TaskId::new(999).unwrap(), at(12, 0), at(13, 0));
        let (start, end) = window();

        let rows = build_report(&store, start, end, &ReportConfig::default()).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn empty_window_is_no_data() {
        let (store, _, _, _) = acme();
        let err = build_report(&store, on(11, 0), on(12, 0), &ReportConfig::default())
            .unwrap_err();
        assert_eq!(err.kind(), "no_data_in_range");
    }

    #[test]
    fn window_is_inclusive_and_does_not_clip() {
        let (store, _, _, _) = acme();
        // 09:00-11:00 starts exactly at the lower bound; 14:00-15:00 straddles the upper one
        let rows =
            build_report(&store, at(9, 0), at(14, 30), &ReportConfig::default()).unwrap();
        assert_eq!(hours(&rows[0]), vec![("A", 2.5), ("B", 0.0)]);
    }

    #[test]
    fn same_title_tasks_share_a_row() {
        let (mut store, acme, _, _) = acme();
        let twin = store.add_task(acme, "A");
        store.add_entry(twin, at(16, 0), at(17, 0));
        let (start, end) = window();

        let rows = build_report(&store, start, end, &ReportConfig::default()).unwrap();
        assert_eq!(hours(&rows[0]), vec![("A", 3.5), ("B", 1.0)]);
        assert!((rows[0].total_hours - 4.5).abs() < 1e-9);
    }

    #[test]
    fn unresolved_client_uses_placeholder() {
        let mut store = MemoryStore::new();
        let task = store.add_task(ClientId::new(77).unwrap(), "Ghost work");
        store.add_entry(task, at(9, 0), at(10, 0));
        let (start, end) = window();
        let config = ReportConfig {
            unknown_client_name: "Sin cliente".to_string(),
        };

        let rows = build_report(&store, start, end, &config).unwrap();
        assert_eq!(rows[0].client_name, "Sin cliente");
        assert_eq!(rows[0].client_id, ClientId::new(77).unwrap());
    }

    #[test]
    fn clients_appear_in_first_seen_order() {
        let (mut store, _, _, _) = acme();
        let globex = store.add_client("Globex");
        let audit = store.add_task(globex, "Audit");
        store.add_entry(audit, at(7, 0), at(8, 0));
        let (start, end) = window();

        let rows = build_report(&store, start, end, &ReportConfig::default()).unwrap();
        let names: Vec<_> = rows.iter().map(|row| row.client_name.as_str()).collect();
        assert_eq!(names, vec!["Globex", "Acme"]);
    }

    #[test]
    fn totals_match_task_sums_after_rounding() {
        let mut store = MemoryStore::new();
        let acme = store.add_client("Acme");
        let a = store.add_task(acme, "A");
        let b = store.add_task(acme, "B");
        // 20 minutes and 40 seconds each
        store.add_entry(a, at(9, 0), at(9, 0) + chrono::Duration::seconds(1240));
        store.add_entry(b, at(10, 0), at(10, 0) + chrono::Duration::seconds(1240));
        let (start, end) = window();

        let rows = build_report(&store, start, end, &ReportConfig::default()).unwrap();
        let sum: f64 = rows[0].tasks.iter().map(|task| task.hours).sum();
        assert_eq!(round_hours(rows[0].total_hours), round_hours(sum));
    }

    #[test]
    fn store_failure_propagates() {
        let (mut store, _, _, _) = acme();
        store.fail_on(Collection::Clients, StoreOperation::Select, None);
        let (start, end) = window();

        let err = build_report(&store, start, end, &ReportConfig::default()).unwrap_err();
        assert_eq!(err.kind(), "store_failure");
    }

    #[test]
    fn client_report_restricts_to_client() {
        let (mut store, acme, _, _) = acme();
        let globex = store.add_client("Globex");
        let audit = store.add_task(globex, "Audit");
        store.add_entry(audit, at(7, 0), at(8, 0));
        let (start, end) = window();

        let row = build_client_report(&store, acme, start, end).unwrap();
        assert_eq!(row.client_name, "Acme");
        assert_eq!(hours(&row), vec![("A", 2.5), ("B", 1.0)]);
    }

    #[test]
    fn client_report_lists_tasks_even_without_own_entries() {
        let (mut store, _, _, _) = acme();
        let globex = store.add_client("Globex");
        store.add_task(globex, "Audit");
        let (start, end) = window();

        let row = build_client_report(&store, globex, start, end).unwrap();
        assert!(row.total_hours.abs() < f64::EPSILON);
        assert_eq!(hours(&row), vec![("Audit", 0.0)]);
    }

    #[test]
    fn client_report_errors() {
        let (mut store, _, _, _) = acme();
        let empty = store.add_client("Empty");
        let (start, end) = window();
        let err =
            build_client_report(&store, ClientId::new(500).unwrap(), start, end).unwrap_err();
        assert_eq!(err.kind(), "client_not_found");
        assert_eq!(err.to_string(), "client 500 not found");

        let err = build_client_report(&store, empty, start, end).unwrap_err();
        assert_eq!(err.kind(), "no_tasks_for_client");

        let err = build_client_report(&store, empty, on(20, 0), on(21, 0)).unwrap_err();
        assert_eq!(err.kind(), "no_data_in_range");
    }

    #[test]
    fn daily_hours_group_by_day_and_client() {
        let mut store = MemoryStore::new();
        let acme = store.add_client("Acme");
        let globex = store.add_client("Globex");
        let design = store.add_task(acme, "Design");
        let audit = store.add_task(globex, "Audit");
        store.add_entry(audit, on(11, 9), on(11, 10));
        store.add_entry(design, on(10, 9), on(10, 11));
        store.add_entry(design, on(10, 14), on(10, 15));
        store.add_entry(audit, on(10, 16), on(10, 18));
        store.add_entry(TaskId::new(999).unwrap(), on(10, 19), on(10, 20));

        let days = daily_client_hours(&store, on(10, 0), on(11, 23), &ReportConfig::default())
            .unwrap();

        insta::assert_snapshot!(serde_json::to_string(&days).unwrap(), @r#"[{"date":"2025-03-10","client":"Acme","hours":3.0},{"date":"2025-03-10","client":"Globex","hours":2.0},{"date":"2025-03-11","client":"Globex","hours":1.0}]"#);
    }

    #[test]
    fn daily_hours_include_entries_ending_after_window() {
        let mut store = MemoryStore::new();
        let acme = store.add_client("Acme");
        let design = store.add_task(acme, "Design");
        store.add_entry(design, on(10, 22), on(11, 2));

        let days =
            daily_client_hours(&store, on(10, 0), on(10, 23), &ReportConfig::default()).unwrap();
        assert_eq!(days.len(), 1);
        assert!((days[0].hours - 4.0).abs() < 1e-9);
    }

    #[test]
    fn daily_hours_empty_window_is_empty() {
        let store = MemoryStore::new();
        let days =
            daily_client_hours(&store, on(10, 0), on(11, 0), &ReportConfig::default()).unwrap();
        assert!(days.is_empty());
    }
}
