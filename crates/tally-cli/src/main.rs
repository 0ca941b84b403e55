use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tally_cli::commands::user::UserAction;
use tally_cli::commands::util::resolve_caller;
use tally_cli::commands::{client, daily, entry, report, task, user};
use tally_cli::{Cli, Commands, Config};
use tally_db::Database;

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = Database::open(&config.database_path).context("failed to open database")?;
    Ok((db, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let (mut db, config) = open_database(cli.config.as_deref())?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match command {
        Commands::User(UserAction::Add {
            username,
            role_code,
        }) => {
            // The role code is the credential; no registered caller yet.
            user::add(&mut out, &mut db, username, role_code)?;
        }
        Commands::User(UserAction::List { json }) => {
            resolve_caller(&db, &config)?;
            user::list(&mut out, &db, *json)?;
        }
        Commands::Client(action) => {
            let caller = resolve_caller(&db, &config)?;
            client::run(&mut out, &mut db, &caller, action)?;
        }
        Commands::Task(action) => {
            let caller = resolve_caller(&db, &config)?;
            task::run(&mut out, &mut db, &caller, action)?;
        }
        Commands::Entry(action) => {
            let caller = resolve_caller(&db, &config)?;
            entry::run(&mut out, &mut db, &caller, action)?;
        }
        Commands::Report(args) => {
            let caller = resolve_caller(&db, &config)?;
            report::run(&mut out, &db, &caller, &config.report_config(), args)?;
        }
        Commands::Daily(args) => {
            let caller = resolve_caller(&db, &config)?;
            daily::run(&mut out, &db, &caller, &config.report_config(), args)?;
        }
    }

    out.flush()?;
    Ok(())
}
