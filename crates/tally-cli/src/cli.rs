//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::client::ClientAction;
use crate::commands::daily::DailyArgs;
use crate::commands::entry::EntryAction;
use crate::commands::report::ReportArgs;
use crate::commands::task::TaskAction;
use crate::commands::user::UserAction;

/// Client hour tracker.
///
/// Records time against client tasks and reports hours per client.
#[derive(Debug, Parser)]
#[command(name = "tally", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Register and list users.
    #[command(subcommand)]
    User(UserAction),

    /// Manage clients.
    #[command(subcommand)]
    Client(ClientAction),

    /// Manage tasks.
    #[command(subcommand)]
    Task(TaskAction),

    /// Record and edit time entries.
    #[command(subcommand)]
    Entry(EntryAction),

    /// Hours per client with per-task subtotals.
    Report(ReportArgs),

    /// Hours per client and calendar day.
    Daily(DailyArgs),
}
