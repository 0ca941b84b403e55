//! Core type definitions with validation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// A record identifier was zero or negative.
    #[error("{field} must be positive, got {value}")]
    NonPositiveId { field: &'static str, value: i64 },

    /// A record identifier could not be parsed.
    #[error("invalid {field}: {value}")]
    InvalidId { field: &'static str, value: String },

    /// Task titles must be 3 to 255 characters long.
    #[error("task title must be between 3 and 255 characters, got {len}")]
    TitleLength { len: usize },

    /// Invalid task status value.
    #[error("invalid task status: {value}")]
    InvalidTaskStatus { value: String },

    /// The role code is not in the role table.
    #[error("invalid role code: {code}")]
    InvalidRoleCode { code: String },

    /// Invalid role name.
    #[error("invalid role: {value}")]
    InvalidRole { value: String },
}

/// Generates a validated integer ID newtype with common trait implementations.
macro_rules! define_record_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "i64", into = "i64")]
        pub struct $name(i64);

        impl $name {
            /// Creates a new ID after validation.
            pub const fn new(id: i64) -> Result<Self, ValidationError> {
                if id <= 0 {
                    return Err(ValidationError::NonPositiveId {
                        field: $field_name,
                        value: id,
                    });
                }
                Ok(Self(id))
            }

            /// Returns the raw integer value.
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl TryFrom<i64> for $name {
            type Error = ValidationError;

            fn try_from(value: i64) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value: i64 = s.trim().parse().map_err(|_| ValidationError::InvalidId {
                    field: $field_name,
                    value: s.to_string(),
                })?;
                Self::new(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_record_id!(
    /// Identifier of a stored time entry.
    TimeEntryId, "time entry ID"
);

define_record_id!(
    /// Identifier of a stored task.
    TaskId, "task ID"
);

define_record_id!(
    /// Identifier of a stored client.
    ///
    /// Clients own tasks; deleting a client cascades to its tasks.
    ClientId, "client ID"
);

define_record_id!(
    /// Identifier of a registered user.
    UserId, "user ID"
);

/// Lifecycle status of a task.
///
/// This enum encodes the valid status values, preventing invalid string values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Newly created, no work started.
    #[default]
    Pending,
    /// Work has started.
    InProgress,
    /// Work is finished.
    Completed,
}

impl TaskStatus {
    /// String representation for database storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            _ => Err(ValidationError::InvalidTaskStatus {
                value: s.to_string(),
            }),
        }
    }
}
