//! Roles and the role-set predicate guarding operations.
//!
//! Authentication itself happens elsewhere; this module only answers whether
//! an already identified caller holds one of the roles an operation allows.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TrackerError;
use crate::model::User;
use crate::types::{UserId, ValidationError};

/// Role held by a registered user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Role {
    /// `socio`
    Partner,
    /// `senior`
    Senior,
    /// `consultor`
    Consultant,
    /// `junior`
    Junior,
    /// `auxiliar`
    Assistant,
}

/// Registration codes mapped to the role they grant.
pub const ROLE_CODES: [(&str, Role); 5] = [
    ("214389", Role::Partner),
    ("132867", Role::Senior),
    ("929491", Role::Consultant),
    ("224566", Role::Junior),
    ("100435", Role::Assistant),
];

/// Roles allowed to read hour reports.
pub const REPORT_VIEWERS: &[Role] = &[Role::Partner, Role::Senior, Role::Consultant];

/// Roles allowed to manage clients and delete tasks.
pub const CLIENT_ADMINS: &[Role] = &[Role::Partner, Role::Senior];

/// Roles allowed to create and update tasks.
pub const TASK_EDITORS: &[Role] = &[Role::Partner, Role::Senior, Role::Consultant];

impl Role {
    /// Resolves a registration code through [`ROLE_CODES`].
    pub fn from_code(code: &str) -> Result<Self, ValidationError> {
        ROLE_CODES
            .iter()
            .find(|(candidate, _)| *candidate == code)
            .map(|(_, role)| *role)
            .ok_or_else(|| ValidationError::InvalidRoleCode {
                code: code.to_string(),
            })
    }

    /// String representation for database storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Partner => "socio",
            Self::Senior => "senior",
            Self::Consultant => "consultor",
            Self::Junior => "junior",
            Self::Assistant => "auxiliar",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "socio" => Ok(Self::Partner),
            "senior" => Ok(Self::Senior),
            "consultor" => Ok(Self::Consultant),
            "junior" => Ok(Self::Junior),
            "auxiliar" => Ok(Self::Assistant),
            _ => Err(ValidationError::InvalidRole {
                value: s.to_string(),
            }),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl TryFrom<String> for Role {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// The identified user performing an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
}

impl From<User> for Caller {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            username: user.username,
            role: user.role,
        }
    }
}

/// Fails with `Unauthorized` unless the caller's role is in `allowed`.
pub fn authorize<'a>(caller: &'a Caller, allowed: &[Role]) -> Result<&'a Caller, TrackerError> {
    if allowed.contains(&caller.role) {
        Ok(caller)
    } else {
        tracing::debug!(user = %caller.username, role = %caller.role, "role not allowed");
        Err(TrackerError::Unauthorized {
            username: caller.username.clone(),
            role: caller.role,
        })
    }
}
