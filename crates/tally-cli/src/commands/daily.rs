//! Hours per client and calendar day, for dashboards.

use std::io::Write;

use anyhow::Result;
use clap::Args;
use tally_core::access::REPORT_VIEWERS;
use tally_core::{Caller, ReportConfig, authorize, daily_client_hours};
use tally_db::Database;

use super::util::{DayBound, parse_datetime, write_json, write_table};

#[derive(Debug, Args)]
pub struct DailyArgs {
    /// Entries starting at or after this time are counted.
    #[arg(long)]
    pub start: String,
    /// Entries starting at or before this time are counted.
    #[arg(long)]
    pub end: String,
    #[arg(long)]
    pub json: bool,
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    caller: &Caller,
    config: &ReportConfig,
    args: &DailyArgs,
) -> Result<()> {
    authorize(caller, REPORT_VIEWERS)?;
    let start = parse_datetime(&args.start, DayBound::Start)?;
    let end = parse_datetime(&args.end, DayBound::End)?;
    let days = daily_client_hours(db, start, end, config)?;

    if args.json {
        return write_json(writer, &days);
    }
    if days.is_empty() {
        writeln!(writer, "No time entries started in this window.")?;
        return Ok(());
    }
    let rows: Vec<Vec<String>> = days
        .iter()
        .map(|day| {
            vec![
                day.date.to_string(),
                day.client.clone(),
                format!("{:.2}", day.hours),
            ]
        })
        .collect();
    write_table(writer, &["DATE", "CLIENT", "HOURS"], &rows, &[2])
}
