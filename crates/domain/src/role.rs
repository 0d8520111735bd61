//! Role types and the user-role relation.
//!
//! Role assignments are keyed by identifiers, never by names, so renaming a
//! role cannot break existing assignments. Names are resolved for output
//! only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::UserId;

/// Unique identifier for a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleId(Uuid);

impl RoleId {
    /// Creates a new random role identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a role identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RoleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RoleId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// A named capability bundle assignable to users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    /// Unique role identifier.
    pub id: RoleId,
    /// Unique role name, e.g. "Admin".
    pub name: String,
    /// Free-text description shown in administrative views.
    pub description: String,
}

/// The fact that a user holds a role.
///
/// At most one assignment exists per `(user, role)` pair; re-assigning the
/// same pair is a no-op, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignment {
    /// The user holding the role.
    pub user_id: UserId,
    /// The held role.
    pub role_id: RoleId,
    /// When the assignment was created.
    pub assigned_at: DateTime<Utc>,
}

/// Outcome of an assign-role operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOutcome {
    /// A new assignment row was created.
    Assigned,
    /// The pair already existed; nothing was written.
    AlreadyAssigned,
}

impl AssignOutcome {
    /// Returns a stable transport value for this outcome.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assigned => "assigned",
            Self::AlreadyAssigned => "already_assigned",
        }
    }
}

/// Outcome of a remove-role operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// The assignment row was deleted.
    Removed,
    /// No such pair existed; nothing was written.
    NotAssigned,
}

impl RemoveOutcome {
    /// Returns a stable transport value for this outcome.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Removed => "removed",
            Self::NotAssigned => "not_assigned",
        }
    }
}
