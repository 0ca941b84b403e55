//! Client operations.

use crate::error::TrackerError;
use crate::model::{Client, ClientPatch, NewClient};
use crate::store::ClientStore;
use crate::types::{ClientId, ValidationError};

pub use crate::cascade::delete_client;

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::Empty {
            field: "client name",
        });
    }
    Ok(())
}

pub fn create_client<S: ClientStore + ?Sized>(
    store: &mut S,
    new: &NewClient,
) -> Result<Client, TrackerError> {
    validate_name(&new.name)?;
    let client = store.insert_client(new)?;
    tracing::debug!(client_id = %client.id, name = %client.name, "client created");
    Ok(client)
}

pub fn list_clients<S: ClientStore + ?Sized>(store: &S) -> Result<Vec<Client>, TrackerError> {
    Ok(store.select_clients()?)
}

pub fn get_client<S: ClientStore + ?Sized>(
    store: &S,
    id: ClientId,
) -> Result<Client, TrackerError> {
    store
        .find_client(id)?
        .ok_or_else(|| TrackerError::client_not_found(id))
}

/// Renames or recolors a client.
pub fn update_client<S: ClientStore + ?Sized>(
    store: &mut S,
    id: ClientId,
    patch: &ClientPatch,
) -> Result<Client, TrackerError> {
    if let Some(name) = &patch.name {
        validate_name(name)?;
    }
    if patch.is_empty() {
        return get_client(&*store, id);
    }
    store
        .update_client(id, patch)?
        .ok_or_else(|| TrackerError::client_not_found(id))
}
