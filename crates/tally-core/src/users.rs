//! User registration. Roles come from registration codes.

use crate::access::Role;
use crate::error::TrackerError;
use crate::model::{NewUser, User};
use crate::store::UserStore;
use crate::types::ValidationError;

/// Registers a user, granting the role bound to `role_code`.
pub fn register_user<S: UserStore + ?Sized>(
    store: &mut S,
    username: &str,
    role_code: &str,
) -> Result<User, TrackerError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(ValidationError::Empty { field: "username" }.into());
    }
    let role = Role::from_code(role_code.trim())?;
    let user = store.insert_user(&NewUser {
        username: username.to_string(),
        role,
    })?;
    tracing::info!(user = %user.username, role = %user.role, "user registered");
    Ok(user)
}

pub fn list_users<S: UserStore + ?Sized>(store: &S) -> Result<Vec<User>, TrackerError> {
    Ok(store.select_users()?)
}

/// Looks a user up by name.
pub fn find_user<S: UserStore + ?Sized>(
    store: &S,
    username: &str,
) -> Result<Option<User>, TrackerError> {
    Ok(store.find_user_by_username(username)?)
}
