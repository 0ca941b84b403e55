//! Shared utilities for CLI commands.

use std::io::Write;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use tally_core::users::find_user;
use tally_core::{Caller, UserStore};

use crate::Config;

/// Pre-compiled regex for relative time parsing.
static RELATIVE_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s+(minute|hour|day|week)s?\s+ago$").unwrap());

/// Conservative bounds for relative time parsing (~1000 years in minutes).
const MAX_RELATIVE_MINUTES: i64 = 1000 * 365 * 24 * 60;

/// Which end of the day a bare date stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayBound {
    /// `00:00:00.000`
    Start,
    /// `23:59:59.999`
    End,
}

/// Parse a datetime string relative to the current time.
pub fn parse_datetime(s: &str, bound: DayBound) -> Result<DateTime<Utc>> {
    parse_datetime_at(s, bound, Utc::now())
}

/// Parse a datetime string.
///
/// Supports:
/// - RFC 3339: "2025-03-10T09:30:00Z"
/// - Naive, read as UTC: "2025-03-10T09:30:00" or "2025-03-10T09:30:00.250"
/// - Date only: "2025-03-10", start or end of that day depending on `bound`
/// - Relative: "2 hours ago", "30 minutes ago", "1 day ago", "1 week ago"
pub fn parse_datetime_at(s: &str, bound: DayBound, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let time = match bound {
            DayBound::Start => date.and_hms_milli_opt(0, 0, 0, 0),
            DayBound::End => date.and_hms_milli_opt(23, 59, 59, 999),
        };
        return time
            .map(|naive| naive.and_utc())
            .with_context(|| format!("invalid date: {s}"));
    }

    let Some(caps) = RELATIVE_TIME_RE.captures(s) else {
        anyhow::bail!(
            "Invalid datetime: {s}. Use RFC 3339 (e.g., 2025-03-10T09:30:00Z), a date (2025-03-10) or relative (e.g., '2 hours ago')"
        );
    };

    let n: i64 = caps[1]
        .parse()
        .context("failed to parse number in relative time")?;

    let (max_for_unit, minutes_per_unit) = match &caps[2] {
        "minute" => (MAX_RELATIVE_MINUTES, 1),
        "hour" => (MAX_RELATIVE_MINUTES / 60, 60),
        "day" => (MAX_RELATIVE_MINUTES / (60 * 24), 60 * 24),
        "week" => (MAX_RELATIVE_MINUTES / (60 * 24 * 7), 60 * 24 * 7),
        unit => anyhow::bail!("Unknown time unit: {unit}"),
    };

    if n > max_for_unit {
        anyhow::bail!("Relative time value too large: {n} {}", &caps[2]);
    }

    Ok(now - Duration::minutes(n * minutes_per_unit))
}

/// Resolves the configured user into the caller of a command.
pub fn resolve_caller<S: UserStore + ?Sized>(store: &S, config: &Config) -> Result<Caller> {
    let Some(username) = config.user.as_deref() else {
        anyhow::bail!("no user configured; set `user` in the config file or TALLY_USER");
    };
    let user = find_user(store, username)?
        .with_context(|| format!("user {username} is not registered"))?;
    tracing::debug!(user = %user.username, role = %user.role, "resolved caller");
    Ok(user.into())
}

/// Formats a timestamp for table output.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}

/// Writes a plain-text table.
///
/// Columns listed in `numeric` are right-aligned; others are left-aligned.
/// Trailing whitespace is trimmed from every line.
pub fn write_table<W: Write>(
    writer: &mut W,
    headers: &[&str],
    rows: &[Vec<String>],
    numeric: &[usize],
) -> Result<()> {
    let mut widths: Vec<usize> = headers.iter().map(|header| header.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    writeln!(writer, "{}", render_line(headers, &widths, numeric))?;
    for row in rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        writeln!(writer, "{}", render_line(&cells, &widths, numeric))?;
    }
    Ok(())
}

fn render_line(cells: &[&str], widths: &[usize], numeric: &[usize]) -> String {
    let line = cells
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(index, (cell, &width))| {
            if numeric.contains(&index) {
                format!("{cell:>width$}")
            } else {
                format!("{cell:<width$}")
            }
        })
        .collect::<Vec<_>>()
        .join("  ");
    line.trim_end().to_string()
}

/// Writes a value as pretty JSON followed by a newline.
pub fn write_json<W, T>(writer: &mut W, value: &T) -> Result<()>
where
    W: Write,
    T: serde::Serialize + ?Sized,
{
    serde_json::to_writer_pretty(&mut *writer, value)?;
    writeln!(writer)?;
    Ok(())
}
