//! Flattening reports into tabular rows for spreadsheet rendering.
//!
//! Rows follow the merged-cell convention: a client's name and total appear
//! only on its first row and are blank on the rows of its remaining tasks.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::interval::round_hours;
use crate::report::ReportRow;

/// Column headers, in cell order.
pub const COLUMNS: [&str; 4] = ["Cliente", "Total Horas", "Tarea", "Horas por Tarea"];

/// One table row. `None` cells are blank and serialize as `""`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatRow {
    #[serde(rename = "Cliente", serialize_with = "text_cell")]
    pub client_name: Option<String>,
    #[serde(rename = "Total Horas", serialize_with = "hours_cell")]
    pub total_hours: Option<f64>,
    #[serde(rename = "Tarea", serialize_with = "text_cell")]
    pub task_title: Option<String>,
    #[serde(rename = "Horas por Tarea", serialize_with = "hours_cell")]
    pub task_hours: Option<f64>,
}

impl FlatRow {
    /// Cell texts, hours with 2 decimals.
    pub fn cells(&self) -> [String; 4] {
        let hours = |value: Option<f64>| value.map(|h| format!("{h:.2}")).unwrap_or_default();
        [
            self.client_name.clone().unwrap_or_default(),
            hours(self.total_hours),
            self.task_title.clone().unwrap_or_default(),
            hours(self.task_hours),
        ]
    }
}

#[allow(clippy::ref_option)]
fn text_cell<S: Serializer>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(value.as_deref().unwrap_or_default())
}

#[allow(clippy::ref_option)]
fn hours_cell<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(hours) => serializer.serialize_f64(round_hours(*hours)),
        None => serializer.serialize_str(""),
    }
}

/// Flattens report rows, one row per task.
///
/// A client without tasks still yields one row, with blank task cells.
pub fn flatten(rows: &[ReportRow]) -> Vec<FlatRow> {
    let mut flat = Vec::new();
    for row in rows {
        let mut first = true;
        let head = |first: bool| {
            first.then(|| (row.client_name.clone(), round_hours(row.total_hours)))
        };

        if row.tasks.is_empty() {
            let (name, total) = head(true).unzip();
            flat.push(FlatRow {
                client_name: name,
                total_hours: total,
                task_title: None,
                task_hours: None,
            });
            continue;
        }

        for task in &row.tasks {
            let (name, total) = head(first).unzip();
            first = false;
            flat.push(FlatRow {
                client_name: name,
                total_hours: total,
                task_title: Some(task.title.clone()),
                task_hours: Some(round_hours(task.hours)),
            });
        }
    }
    flat
}

/// A report ready for the spreadsheet renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportDocument {
    pub title: String,
    pub file_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<FlatRow>,
}

impl ExportDocument {
    /// Document for the all-clients report.
    pub fn for_report(rows: &[ReportRow], start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            title: "Hours report by client".to_string(),
            file_name: format!("hours_report_{}_{}.xlsx", day(start), day(end)),
            columns: COLUMNS.iter().map(ToString::to_string).collect(),
            rows: flatten(rows),
        }
    }

    /// Document for a single client's report.
    pub fn for_client(row: &ReportRow, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            title: format!("Hours report for {}", row.client_name),
            file_name: format!(
                "client_report_{}_{}_{}.xlsx",
                file_safe(&row.client_name),
                day(start),
                day(end)
            ),
            columns: COLUMNS.iter().map(ToString::to_string).collect(),
            rows: flatten(std::slice::from_ref(row)),
        }
    }
}

/// Replaces characters that are not allowed in file names on common platforms.
fn file_safe(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

fn day(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}
