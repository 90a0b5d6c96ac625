//! Vocabulary shared by the boundary enforcer and its callers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Capability flags carried by roles and folded into effective permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Assign and remove role assignments for other staff.
    ManageStaff,
    /// Create and update roles.
    CreateRoles,
    /// Delete roles.
    DeleteRoles,
}

impl Capability {
    /// Returns a stable storage value for this capability.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ManageStaff => "can_manage_staff",
            Self::CreateRoles => "can_create_roles",
            Self::DeleteRoles => "can_delete_roles",
        }
    }

    /// Returns all capability flags.
    #[must_use]
    pub fn all() -> &'static [Self] {
        &[Self::ManageStaff, Self::CreateRoles, Self::DeleteRoles]
    }
}

/// Specific reason a role mutation was refused.
///
/// Priorities are strict ceilings: an action on a priority equal to the
/// caller's own maximum is refused just like one above it.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DenialReason {
    /// Caller lacks the capability the mutation requires.
    #[error("caller lacks the '{}' capability", .capability.as_str())]
    MissingCapability {
        /// Required capability.
        capability: Capability,
    },

    /// Requested role flags include a capability the caller does not hold.
    #[error("caller cannot grant the '{}' capability", .capability.as_str())]
    CapabilityEscalation {
        /// Capability the caller tried to grant.
        capability: Capability,
    },

    /// Target role sits at or above the caller's authority.
    #[error("role priority {priority} is not below caller ceiling {ceiling}")]
    PriorityBoundaryExceeded {
        /// Priority of the role being acted on.
        priority: i32,
        /// Highest priority the caller may act on, exclusive.
        ceiling: i32,
    },

    /// Requested new priority sits at or above the caller's authority.
    #[error("requested priority {requested} is not below caller ceiling {ceiling}")]
    PriorityEscalation {
        /// Requested priority level.
        requested: i32,
        /// Highest priority the caller may request, exclusive.
        ceiling: i32,
    },

    /// Caller may not grant a permission they do not hold.
    #[error("caller cannot grant permission '{permission}'")]
    PermissionEscalation {
        /// Permission name.
        permission: String,
    },

    /// Staff members may never assign roles to themselves.
    #[error("staff members cannot assign roles to themselves")]
    SelfAssignment,

    /// Target already holds an active assignment for the role.
    #[error("role is already assigned to this staff member")]
    DuplicateAssignment,

    /// Self-removal would leave the staff member without any role.
    #[error("cannot remove the last active role assignment")]
    LastRoleRemoval,

    /// System roles cannot be deleted.
    #[error("system roles cannot be deleted")]
    SystemRoleProtected,
}

impl DenialReason {
    /// Returns the stable reason code surfaced to callers.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingCapability { capability } => match capability {
                Capability::ManageStaff => "CANNOT_MANAGE_STAFF",
                Capability::CreateRoles => "CANNOT_CREATE_ROLES",
                Capability::DeleteRoles => "CANNOT_DELETE_ROLES",
            },
            Self::CapabilityEscalation { capability } => match capability {
                Capability::ManageStaff => "CANNOT_GRANT_MANAGE_STAFF",
                Capability::CreateRoles => "CANNOT_GRANT_CREATE_ROLES",
                Capability::DeleteRoles => "CANNOT_GRANT_DELETE_ROLES",
            },
            Self::PriorityBoundaryExceeded { .. } => "PRIORITY_BOUNDARY_EXCEEDED",
            Self::PriorityEscalation { .. } => "PRIORITY_ESCALATION_DENIED",
            Self::PermissionEscalation { .. } => "PERMISSION_ESCALATION_DENIED",
            Self::SelfAssignment => "SELF_ASSIGNMENT_DENIED",
            Self::DuplicateAssignment => "ROLE_ALREADY_ASSIGNED",
            Self::LastRoleRemoval => "CANNOT_REMOVE_LAST_ROLE",
            Self::SystemRoleProtected => "SYSTEM_ROLE_PROTECTED",
        }
    }
}
