//! Permission vocabulary shared by every enforcement layer.
//!
//! Both the non-authoritative client guard and the authoritative server
//! guard consume this single enumeration, so the set of checkable
//! capabilities cannot drift between the two.

use std::str::FromStr;

use nutrack_core::AppError;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Name of the system administrator role. The global invariant that at least
/// one active user holds this role is enforced against this name.
pub const ADMIN_ROLE_NAME: &str = "Admin";

/// Role assigned implicitly at user registration.
pub const DEFAULT_ROLE_NAME: &str = "Customer";

/// Permissions enforced by application policy checks.
///
/// Variants serialize as their stable dotted codes so that credentials and
/// database rows share one wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Permission {
    /// Allows viewing user accounts and their roles.
    UsersView,
    /// Allows mutating user accounts (activate, deactivate).
    UsersManage,
    /// Allows creating food catalog entries.
    FoodCreate,
    /// Allows editing and removing food catalog entries.
    FoodManage,
    /// Allows writing nutrition log entries.
    NutritionLogWrite,
    /// Allows managing workout plans and sessions.
    WorkoutManage,
    /// Allows managing fitness goals.
    GoalManage,
    /// Allows viewing aggregate reports and dashboards.
    ReportView,
    /// Allows using the chat assistant.
    ChatUse,
    /// Allows managing roles and role assignments.
    SecurityRoleManage,
}

impl Permission {
    /// Returns a stable storage value for this permission.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UsersView => "users.view",
            Self::UsersManage => "users.manage",
            Self::FoodCreate => "food.create",
            Self::FoodManage => "food.manage",
            Self::NutritionLogWrite => "nutrition.log.write",
            Self::WorkoutManage => "workout.manage",
            Self::GoalManage => "goal.manage",
            Self::ReportView => "report.view",
            Self::ChatUse => "chat.use",
            Self::SecurityRoleManage => "security.role.manage",
        }
    }

    /// Returns all known permissions.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Permission] = &[
            Permission::UsersView,
            Permission::UsersManage,
            Permission::FoodCreate,
            Permission::FoodManage,
            Permission::NutritionLogWrite,
            Permission::WorkoutManage,
            Permission::GoalManage,
            Permission::ReportView,
            Permission::ChatUse,
            Permission::SecurityRoleManage,
        ];

        ALL
    }
}

impl FromStr for Permission {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "users.view" => Ok(Self::UsersView),
            "users.manage" => Ok(Self::UsersManage),
            "food.create" => Ok(Self::FoodCreate),
            "food.manage" => Ok(Self::FoodManage),
            "nutrition.log.write" => Ok(Self::NutritionLogWrite),
            "workout.manage" => Ok(Self::WorkoutManage),
            "goal.manage" => Ok(Self::GoalManage),
            "report.view" => Ok(Self::ReportView),
            "chat.use" => Ok(Self::ChatUse),
            "security.role.manage" => Ok(Self::SecurityRoleManage),
            _ => Err(AppError::Validation(format!(
                "unknown permission value '{value}'"
            ))),
        }
    }
}

impl Serialize for Permission {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Permission {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::from_str(value.as_str()).map_err(|error| D::Error::custom(error.to_string()))
    }
}

/// Declared access requirement for a route or UI surface.
///
/// Absence of both fields means any authenticated principal may proceed;
/// a declared requirement denies every principal lacking it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccessRequirement {
    /// Requires the principal to hold the administrator role.
    pub require_admin: bool,
    /// Requires the principal to hold a specific permission.
    pub required_permission: Option<Permission>,
}

impl AccessRequirement {
    /// Requirement satisfied by any authenticated principal.
    #[must_use]
    pub fn authenticated() -> Self {
        Self::default()
    }

    /// Requirement for a specific permission.
    #[must_use]
    pub fn permission(permission: Permission) -> Self {
        Self {
            require_admin: false,
            required_permission: Some(permission),
        }
    }

    /// Requirement for the administrator role.
    #[must_use]
    pub fn admin() -> Self {
        Self {
            require_admin: true,
            required_permission: None,
        }
    }
}

/// Stable audit actions emitted by application use-cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted when a role is assigned to a user.
    SecurityRoleAssigned,
    /// Emitted when a role is removed from a user.
    SecurityRoleUnassigned,
    /// Emitted when a user's role set is replaced.
    SecurityRoleReplaced,
    /// Emitted when a user account is activated or deactivated.
    SecurityUserActiveToggled,
    /// Emitted when a credential is issued at login or refresh.
    SecurityCredentialIssued,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SecurityRoleAssigned => "security.role.assigned",
            Self::SecurityRoleUnassigned => "security.role.unassigned",
            Self::SecurityRoleReplaced => "security.role.replaced",
            Self::SecurityUserActiveToggled => "security.user.active_toggled",
            Self::SecurityCredentialIssued => "security.credential.issued",
        }
    }
}
