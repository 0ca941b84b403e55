//! User registration and listing.

use std::io::Write;

use anyhow::Result;
use clap::Subcommand;
use tally_core::users::{list_users, register_user};
use tally_db::Database;

use super::util::{write_json, write_table};

#[derive(Debug, Subcommand)]
pub enum UserAction {
    /// Register a user. The role code decides the role.
    Add {
        /// Login name.
        username: String,
        /// Registration code granting a role.
        #[arg(long)]
        role_code: String,
    },
    /// List registered users.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Registers a user. Needs no caller: the role code is the credential.
pub fn add<W: Write>(
    writer: &mut W,
    db: &mut Database,
    username: &str,
    role_code: &str,
) -> Result<()> {
    let user = register_user(db, username, role_code)?;
    writeln!(
        writer,
        "Registered user {} ({}) with id {}",
        user.username, user.role, user.id
    )?;
    Ok(())
}

pub fn list<W: Write>(writer: &mut W, db: &Database, json: bool) -> Result<()> {
    let users = list_users(db)?;
    if json {
        return write_json(writer, &users);
    }
    if users.is_empty() {
        writeln!(writer, "No users registered.")?;
        return Ok(());
    }
    let rows: Vec<Vec<String>> = users
        .iter()
        .map(|user| {
            vec![
                user.id.to_string(),
                user.username.clone(),
                user.role.to_string(),
            ]
        })
        .collect();
    write_table(writer, &["ID", "USERNAME", "ROLE"], &rows, &[0])
}
