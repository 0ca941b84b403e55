//! Report command: hours per client with per-task subtotals.
//!
//! Prints the flattened table by default. `--json` emits the nested report,
//! `--flat` the flattened rows, and `--output` writes a spreadsheet-ready
//! export document to a file.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use tally_core::access::REPORT_VIEWERS;
use tally_core::export::COLUMNS;
use tally_core::{
    Caller, ClientId, ExportDocument, ReportConfig, ReportRow, authorize, build_client_report,
    build_report, flatten,
};
use tally_db::Database;

use super::util::{DayBound, parse_datetime, write_json, write_table};

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Start of the window (inclusive). A bare date means 00:00:00.000.
    #[arg(long)]
    pub start: String,
    /// End of the window (inclusive). A bare date means 23:59:59.999.
    #[arg(long)]
    pub end: String,
    /// Restrict the report to one client.
    #[arg(long)]
    pub client: Option<ClientId>,
    /// Output the nested report as JSON.
    #[arg(long, conflicts_with = "flat")]
    pub json: bool,
    /// Output the flattened table rows as JSON.
    #[arg(long)]
    pub flat: bool,
    /// Write the export document to this file instead of printing.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    caller: &Caller,
    config: &ReportConfig,
    args: &ReportArgs,
) -> Result<()> {
    authorize(caller, REPORT_VIEWERS)?;
    let start = parse_datetime(&args.start, DayBound::Start)?;
    let end = parse_datetime(&args.end, DayBound::End)?;

    let (rows, document) = match args.client {
        Some(client_id) => {
            let row = build_client_report(db, client_id, start, end)?;
            let document = ExportDocument::for_client(&row, start, end);
            (vec![row], document)
        }
        None => {
            let rows = build_report(db, start, end, config)?;
            let document = ExportDocument::for_report(&rows, start, end);
            (rows, document)
        }
    };

    if let Some(path) = &args.output {
        write_document(path, &document)?;
        writeln!(writer, "Wrote {} to {}", document.file_name, path.display())?;
        return Ok(());
    }

    if args.json {
        return write_json(writer, &rows);
    }
    if args.flat {
        return write_json(writer, &flatten(&rows));
    }
    write_report_table(writer, &rows, start, end)
}

fn write_document(path: &Path, document: &ExportDocument) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut file = BufWriter::new(file);
    write_json(&mut file, document)?;
    file.flush()?;
    tracing::info!(path = %path.display(), rows = document.rows.len(), "export written");
    Ok(())
}

fn write_report_table<W: Write>(
    writer: &mut W,
    rows: &[ReportRow],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<()> {
    if rows.is_empty() {
        writeln!(
            writer,
            "No hours for known tasks between {} and {}.",
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d")
        )?;
        return Ok(());
    }
    let cells: Vec<Vec<String>> = flatten(rows)
        .iter()
        .map(|row| row.cells().to_vec())
        .collect();
    write_table(writer, &COLUMNS, &cells, &[1, 3])
}
