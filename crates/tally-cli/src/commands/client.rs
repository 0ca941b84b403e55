//! Client management. Restricted to partners and seniors.

use std::io::Write;

use anyhow::Result;
use clap::Subcommand;
use tally_core::access::CLIENT_ADMINS;
use tally_core::clients::{create_client, delete_client, list_clients, update_client};
use tally_core::model::{ClientPatch, NewClient};
use tally_core::{Caller, ClientId, authorize};
use tally_db::Database;

use super::util::{write_json, write_table};

const DEFAULT_COLOR: &str = "#808080";

#[derive(Debug, Subcommand)]
pub enum ClientAction {
    /// Create a client.
    Add {
        /// Client name.
        name: String,
        /// Display color.
        #[arg(long, default_value = DEFAULT_COLOR)]
        color: String,
    },
    /// List clients.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Rename or recolor a client.
    Update {
        id: ClientId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    /// Delete a client with all of its tasks and time entries.
    Delete { id: ClientId },
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    caller: &Caller,
    action: &ClientAction,
) -> Result<()> {
    authorize(caller, CLIENT_ADMINS)?;

    match action {
        ClientAction::Add { name, color } => {
            let client = create_client(
                db,
                &NewClient {
                    name: name.trim().to_string(),
                    color: color.clone(),
                },
            )?;
            writeln!(writer, "Created client {}: {}", client.id, client.name)?;
        }
        ClientAction::List { json } => {
            let clients = list_clients(db)?;
            if *json {
                return write_json(writer, &clients);
            }
            if clients.is_empty() {
                writeln!(writer, "No clients.")?;
                return Ok(());
            }
            let rows: Vec<Vec<String>> = clients
                .iter()
                .map(|client| {
                    vec![
                        client.id.to_string(),
                        client.name.clone(),
                        client.color.clone(),
                    ]
                })
                .collect();
            write_table(writer, &["ID", "NAME", "COLOR"], &rows, &[0])?;
        }
        ClientAction::Update { id, name, color } => {
            let patch = ClientPatch {
                name: name.as_deref().map(str::trim).map(str::to_string),
                color: color.clone(),
            };
            let client = update_client(db, *id, &patch)?;
            writeln!(writer, "Updated client {}: {}", client.id, client.name)?;
        }
        ClientAction::Delete { id } => {
            let summary = delete_client(db, *id)?;
            writeln!(
                writer,
                "Deleted client {id} ({} tasks, {} time entries)",
                summary.tasks_deleted, summary.time_entries_deleted
            )?;
        }
    }
    Ok(())
}
