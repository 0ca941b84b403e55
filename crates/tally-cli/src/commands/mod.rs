//! CLI subcommand implementations.

pub mod client;
pub mod daily;
pub mod entry;
pub mod report;
pub mod task;
pub mod user;
pub mod util;
