//! Core domain logic for client hour tracking.
//!
//! This crate contains the fundamental types and logic for:
//! - Interval validation and duration arithmetic for time entries
//! - Time entry, task and client services over a pluggable record store
//! - Cascade deletes (client → tasks → time entries)
//! - Report aggregation: per-client totals with per-task subtotals
//! - Flattening reports into tabular export rows

pub mod access;
pub mod cascade;
pub mod clients;
pub mod entries;
mod error;
pub mod export;
pub mod interval;
pub mod model;
pub mod report;
pub mod store;
pub mod tasks;
pub mod types;
pub mod users;

#[cfg(test)]
mod fixture;

pub use access::{Caller, Role, authorize};
pub use error::{CascadeStep, TrackerError};
pub use export::{ExportDocument, FlatRow, flatten};
pub use interval::{InvalidInterval, TimeInterval, duration_hours, truncate_to_millis};
pub use model::{Client, Task, TimeEntry, User};
pub use report::{
    DailyClientHours, ReportConfig, ReportRow, TaskHours, build_client_report, build_report,
    daily_client_hours,
};
pub use store::{
    ClientStore, Collection, RecordStore, StoreError, StoreOperation, TaskStore, TimeEntryStore,
    UserStore,
};
pub use types::{ClientId, TaskId, TaskStatus, TimeEntryId, UserId, ValidationError};
