//! Interval validation and duration arithmetic for time entries.
//!
//! A time entry is only ever stored with `start < end`, and its
//! `duration_hours` is always derived from the two bounds. Rounding is a
//! presentation concern handled by the report layer; values produced here are
//! never rounded.
//!
//! Bounds carry millisecond precision, the resolution records are stored at.

use chrono::{DateTime, SubsecRound, Utc};
use thiserror::Error;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// The start of an interval was not strictly before its end.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("start time {start} must be before end time {end}")]
pub struct InvalidInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A validated `[start, end)` work interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeInterval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeInterval {
    /// Validates the pair, rejecting `start >= end` (equal timestamps included).
    ///
    /// Both bounds are truncated to whole milliseconds first.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, InvalidInterval> {
        let start = truncate_to_millis(start);
        let end = truncate_to_millis(end);
        if start >= end {
            return Err(InvalidInterval { start, end });
        }
        Ok(Self { start, end })
    }

    /// Builds the interval an update produces: each bound falls back to the
    /// stored value when the update leaves it untouched.
    pub fn effective(
        stored: Self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Self, InvalidInterval> {
        Self::new(start.unwrap_or(stored.start), end.unwrap_or(stored.end))
    }

    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Elapsed hours between the bounds.
    pub fn hours(&self) -> f64 {
        duration_hours(self.start, self.end)
    }
}

/// Converts a start/end pair into elapsed hours.
///
/// Millisecond precision is kept, so `duration_hours(s, e) * 3600` equals the
/// elapsed seconds (fractional part included).
#[allow(clippy::cast_precision_loss)]
pub fn duration_hours(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_milliseconds() as f64 / MILLIS_PER_HOUR
}

/// Drops sub-millisecond precision.
pub fn truncate_to_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    at.trunc_subsecs(3)
}

/// Rounds an hour value to 2 decimal places for display.
pub(crate) fn round_hours(hours: f64) -> f64 {
    (hours * 100.0).round() / 100.0
}
