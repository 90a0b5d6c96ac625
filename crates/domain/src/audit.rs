use std::str::FromStr;

use serde::{Deserialize, Serialize};
use staffguard_core::AppError;

use crate::{Department, Permission, Role, RoleAssignment, RoleId, Team};

/// Stable audit actions emitted by RBAC use-cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// A role was created.
    RoleCreated,
    /// A role was updated.
    RoleUpdated,
    /// An unreferenced role was deleted.
    RoleDeleted,
    /// A referenced role was deactivated instead of deleted.
    RoleDeactivated,
    /// A role's permission set was replaced.
    RolePermissionsChanged,
    /// A role was assigned to a staff member.
    RoleAssigned,
    /// A role assignment was removed.
    RoleRemoved,
    /// A staff member's primary role changed.
    PrimaryRoleChanged,
    /// Default roles were seeded for a tenant.
    RolesSeeded,
    /// A role was assigned from identity provider claims.
    RoleSyncedFromClaims,
    /// A department was created.
    DepartmentCreated,
    /// A department was updated.
    DepartmentUpdated,
    /// A department was deleted.
    DepartmentDeleted,
    /// A team was created.
    TeamCreated,
    /// A team was updated.
    TeamUpdated,
    /// A team was deleted.
    TeamDeleted,
    /// An assignment lapsed at its expiry.
    AssignmentExpired,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoleCreated => "role_created",
            Self::RoleUpdated => "role_updated",
            Self::RoleDeleted => "role_deleted",
            Self::RoleDeactivated => "role_deactivated",
            Self::RolePermissionsChanged => "role_permissions_changed",
            Self::RoleAssigned => "role_assigned",
            Self::RoleRemoved => "role_removed",
            Self::PrimaryRoleChanged => "primary_role_changed",
            Self::RolesSeeded => "roles_seeded",
            Self::RoleSyncedFromClaims => "role_synced_from_claims",
            Self::DepartmentCreated => "department_created",
            Self::DepartmentUpdated => "department_updated",
            Self::DepartmentDeleted => "department_deleted",
            Self::TeamCreated => "team_created",
            Self::TeamUpdated => "team_updated",
            Self::TeamDeleted => "team_deleted",
            Self::AssignmentExpired => "assignment_expired",
        }
    }

    /// Returns all audit actions.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[AuditAction] = &[
            AuditAction::RoleCreated,
            AuditAction::RoleUpdated,
            AuditAction::RoleDeleted,
            AuditAction::RoleDeactivated,
            AuditAction::RolePermissionsChanged,
            AuditAction::RoleAssigned,
            AuditAction::RoleRemoved,
            AuditAction::PrimaryRoleChanged,
            AuditAction::RolesSeeded,
            AuditAction::RoleSyncedFromClaims,
            AuditAction::DepartmentCreated,
            AuditAction::DepartmentUpdated,
            AuditAction::DepartmentDeleted,
            AuditAction::TeamCreated,
            AuditAction::TeamUpdated,
            AuditAction::TeamDeleted,
            AuditAction::AssignmentExpired,
        ];

        ALL
    }
}

impl FromStr for AuditAction {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|action| action.as_str() == value)
            .ok_or_else(|| AppError::Validation(format!("unknown audit action '{value}'")))
    }
}

/// Kind of entity an audit fact is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEntityType {
    /// Role record.
    Role,
    /// Role assignment record.
    RoleAssignment,
    /// Department record.
    Department,
    /// Team record.
    Team,
}

impl AuditEntityType {
    /// Returns a stable storage value for this entity type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Role => "role",
            Self::RoleAssignment => "role_assignment",
            Self::Department => "department",
            Self::Team => "team",
        }
    }
}

/// Typed before/after value recorded with an audit fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AuditSnapshot {
    /// Full role state.
    Role(Role),
    /// Role permission set.
    Permissions(Vec<Permission>),
    /// Full assignment state.
    Assignment(RoleAssignment),
    /// Primary role marker.
    PrimaryRole(RoleId),
    /// Full department state.
    Department(Department),
    /// Full team state.
    Team(Team),
    /// Seeded role names.
    SeededRoles(Vec<String>),
}
