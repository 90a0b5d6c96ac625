//! Priority and capability boundary checks for role mutations.
//!
//! Every priority comparison is strict: a caller acts only on priorities
//! below their own maximum, never on equal ones.

use std::collections::BTreeSet;

use staffguard_core::{Capability, DenialReason, StaffId};

use crate::{EffectivePermissions, Permission, PriorityLevel, RoleCapabilities};

/// Role mutation presented to the enforcer with its target state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleMutation<'a> {
    /// Creating a new role.
    CreateRole {
        /// Requested priority.
        priority: PriorityLevel,
        /// Requested capability flags.
        capabilities: RoleCapabilities,
        /// Requested catalog permissions.
        permissions: &'a BTreeSet<Permission>,
    },
    /// Updating an existing role or its permission set.
    UpdateRole {
        /// Current priority of the role.
        existing_priority: PriorityLevel,
        /// Current capability flags of the role.
        existing_capabilities: RoleCapabilities,
        /// Current permission set of the role.
        existing_permissions: &'a BTreeSet<Permission>,
        /// Requested priority, if changing.
        new_priority: Option<PriorityLevel>,
        /// Requested capability flags, if changing.
        new_capabilities: Option<RoleCapabilities>,
        /// Requested permission set, if changing.
        new_permissions: Option<&'a BTreeSet<Permission>>,
    },
    /// Deleting a role.
    DeleteRole {
        /// Current priority of the role.
        existing_priority: PriorityLevel,
        /// Whether the role is system-managed.
        is_system: bool,
    },
    /// Assigning a role to a staff member.
    AssignRole {
        /// Staff member receiving the role.
        target: StaffId,
        /// Priority of the role.
        role_priority: PriorityLevel,
        /// Whether the target already holds an active assignment for the role.
        already_assigned: bool,
    },
    /// Removing a role assignment.
    RemoveRole {
        /// Staff member losing the role.
        target: StaffId,
        /// Priority of the role.
        role_priority: PriorityLevel,
    },
    /// Re-marking which assignment is primary.
    SetPrimary {
        /// Staff member whose primary role changes.
        target: StaffId,
        /// Priority of the role becoming primary.
        role_priority: PriorityLevel,
    },
}

impl RoleMutation<'_> {
    /// Returns a stable label for logs and audit details.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateRole { .. } => "create_role",
            Self::UpdateRole { .. } => "update_role",
            Self::DeleteRole { .. } => "delete_role",
            Self::AssignRole { .. } => "assign_role",
            Self::RemoveRole { .. } => "remove_role",
            Self::SetPrimary { .. } => "set_primary",
        }
    }
}

/// Authorizes `mutation` for the caller or returns the first violated rule.
pub fn authorize_role_mutation(
    caller_id: StaffId,
    caller: &EffectivePermissions,
    mutation: &RoleMutation<'_>,
) -> Result<(), DenialReason> {
    match mutation {
        RoleMutation::CreateRole {
            priority,
            capabilities,
            permissions,
        } => {
            require_capability(caller, Capability::CreateRoles)?;
            require_requested_priority(caller, *priority)?;
            require_no_capability_escalation(caller, *capabilities, RoleCapabilities::NONE)?;
            require_no_permission_escalation(caller, permissions, &BTreeSet::new())
        }
        RoleMutation::UpdateRole {
            existing_priority,
            existing_capabilities,
            existing_permissions,
            new_priority,
            new_capabilities,
            new_permissions,
        } => {
            require_capability(caller, Capability::CreateRoles)?;
            require_outranked(caller, *existing_priority)?;
            if let Some(new_priority) = new_priority {
                require_requested_priority(caller, *new_priority)?;
            }
            if let Some(new_capabilities) = new_capabilities {
                require_no_capability_escalation(
                    caller,
                    *new_capabilities,
                    *existing_capabilities,
                )?;
            }
            if let Some(new_permissions) = new_permissions {
                require_no_permission_escalation(caller, new_permissions, existing_permissions)?;
            }
            Ok(())
        }
        RoleMutation::DeleteRole {
            existing_priority,
            is_system,
        } => {
            require_capability(caller, Capability::DeleteRoles)?;
            if *is_system {
                return Err(DenialReason::SystemRoleProtected);
            }
            require_outranked(caller, *existing_priority)
        }
        RoleMutation::AssignRole {
            target,
            role_priority,
            already_assigned,
        } => {
            require_capability(caller, Capability::ManageStaff)?;
            if *target == caller_id {
                return Err(DenialReason::SelfAssignment);
            }
            require_outranked(caller, *role_priority)?;
            if let Some(limit) = caller.assignable_limit
                && role_priority.value() > limit
            {
                return Err(DenialReason::PriorityBoundaryExceeded {
                    priority: role_priority.value(),
                    ceiling: limit.saturating_add(1),
                });
            }
            if *already_assigned {
                return Err(DenialReason::DuplicateAssignment);
            }
            Ok(())
        }
        RoleMutation::RemoveRole {
            target: _,
            role_priority,
        } => {
            require_capability(caller, Capability::ManageStaff)?;
            require_outranked(caller, *role_priority)
        }
        RoleMutation::SetPrimary {
            target,
            role_priority,
        } => {
            if *target == caller_id {
                return Ok(());
            }
            require_capability(caller, Capability::ManageStaff)?;
            require_outranked(caller, *role_priority)
        }
    }
}

fn require_capability(
    caller: &EffectivePermissions,
    capability: Capability,
) -> Result<(), DenialReason> {
    if caller.has_capability(capability) {
        Ok(())
    } else {
        Err(DenialReason::MissingCapability { capability })
    }
}

fn require_outranked(
    caller: &EffectivePermissions,
    priority: PriorityLevel,
) -> Result<(), DenialReason> {
    if caller.outranks(priority) {
        Ok(())
    } else {
        Err(DenialReason::PriorityBoundaryExceeded {
            priority: priority.value(),
            ceiling: caller.max_priority.value(),
        })
    }
}

fn require_requested_priority(
    caller: &EffectivePermissions,
    requested: PriorityLevel,
) -> Result<(), DenialReason> {
    if caller.outranks(requested) {
        Ok(())
    } else {
        Err(DenialReason::PriorityEscalation {
            requested: requested.value(),
            ceiling: caller.max_priority.value(),
        })
    }
}

fn require_no_capability_escalation(
    caller: &EffectivePermissions,
    requested: RoleCapabilities,
    existing: RoleCapabilities,
) -> Result<(), DenialReason> {
    match requested
        .added_since(existing)
        .find(|capability| !caller.has_capability(*capability))
    {
        Some(capability) => Err(DenialReason::CapabilityEscalation { capability }),
        None => Ok(()),
    }
}

fn require_no_permission_escalation(
    caller: &EffectivePermissions,
    requested: &BTreeSet<Permission>,
    existing: &BTreeSet<Permission>,
) -> Result<(), DenialReason> {
    match requested
        .difference(existing)
        .find(|permission| !caller.has_permission(**permission))
    {
        Some(permission) => Err(DenialReason::PermissionEscalation {
            permission: permission.as_str().to_owned(),
        }),
        None => Ok(()),
    }
}
