use std::sync::Arc;

use chrono::{DateTime, Utc};
use staffguard_core::{AppError, AppResult, StaffId, StaffPrincipal};
use staffguard_domain::{
    AssignmentScope, AuditAction, AuditEntityType, AuditSnapshot, EffectivePermissions,
    NewAssignment, Permission, RoleAssignment, RoleId, RoleMutation, StaffScope,
    authorize_role_mutation,
};

use crate::{
    AssignmentLedger, AuditDispatcher, AuditEvent, EffectivePermissionService, LockedAssignment,
    StaffDirectory,
};

#[cfg(test)]
mod tests;

/// Input payload for assigning a role to a staff member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignRoleInput {
    /// Staff member receiving the role.
    pub staff_id: StaffId,
    /// Role to assign.
    pub role_id: RoleId,
    /// Optional narrower context.
    pub scope: Option<AssignmentScope>,
    /// Optional expiry; must lie in the future.
    pub expires_at: Option<DateTime<Utc>>,
    /// Whether the new assignment becomes primary.
    pub is_primary: bool,
    /// Free-form notes.
    pub notes: Option<String>,
}

/// Application service for the role assignment ledger.
#[derive(Clone)]
pub struct AssignmentService {
    permissions: EffectivePermissionService,
    ledger: Arc<dyn AssignmentLedger>,
    staff_directory: Arc<dyn StaffDirectory>,
    audit: AuditDispatcher,
}

impl AssignmentService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        permissions: EffectivePermissionService,
        ledger: Arc<dyn AssignmentLedger>,
        staff_directory: Arc<dyn StaffDirectory>,
        audit: AuditDispatcher,
    ) -> Self {
        Self {
            permissions,
            ledger,
            staff_directory,
            audit,
        }
    }

    /// Assigns a role to another staff member.
    ///
    /// The boundary check runs against the locked role and assignment rows,
    /// so two concurrent assignments of the same role cannot both succeed.
    pub async fn assign_role(
        &self,
        actor: &StaffPrincipal,
        input: AssignRoleInput,
    ) -> AppResult<RoleAssignment> {
        let caller = self
            .permissions
            .require_permission(actor, Permission::RolesAssign)
            .await?;

        if input.expires_at.is_some_and(|expires_at| expires_at <= Utc::now()) {
            return Err(AppError::Validation(
                "assignment expiry must be in the future".to_owned(),
            ));
        }
        if !self
            .staff_directory
            .staff_exists(actor.tenant_id(), input.staff_id)
            .await?
        {
            return Err(AppError::NotFound(format!(
                "staff member '{}' was not found in tenant '{}'",
                input.staff_id,
                actor.tenant_id()
            )));
        }

        let caller_id = actor.staff_id();
        let target = input.staff_id;
        let guard = |locked: LockedAssignment<'_>| -> AppResult<()> {
            authorize_role_mutation(
                caller_id,
                &caller,
                &RoleMutation::AssignRole {
                    target,
                    role_priority: locked.role.priority,
                    already_assigned: locked.already_assigned,
                },
            )
            .map_err(AppError::from)
        };

        let assignment = self
            .ledger
            .assign(
                actor.tenant_id(),
                actor.vendor_id(),
                NewAssignment {
                    staff_id: input.staff_id,
                    role_id: input.role_id,
                    scope: input.scope,
                    expires_at: input.expires_at,
                    is_primary: input.is_primary,
                    assigned_by: Some(caller_id),
                    notes: input.notes,
                },
                &guard,
            )
            .await?;

        self.permissions
            .invalidate_staff(actor.tenant_id(), assignment.vendor_id, target)
            .await;
        self.audit.emit(
            AuditEvent::new(
                actor.tenant_id(),
                actor.vendor_id(),
                AuditAction::RoleAssigned,
                AuditEntityType::RoleAssignment,
                assignment.assignment_id.to_string(),
            )
            .performed_by(caller_id)
            .targeting(target)
            .with_new_value(AuditSnapshot::Assignment(assignment.clone())),
        );

        Ok(assignment)
    }

    /// Removes a role from a staff member, refusing to strip the actor's own
    /// last role.
    pub async fn remove_role(
        &self,
        actor: &StaffPrincipal,
        staff_id: StaffId,
        role_id: RoleId,
    ) -> AppResult<RoleAssignment> {
        let caller = self
            .permissions
            .require_permission(actor, Permission::RolesAssign)
            .await?;
        let caller_id = actor.staff_id();
        let is_self_removal = staff_id == caller_id;

        let guard = |locked: LockedAssignment<'_>| -> AppResult<()> {
            authorize_role_mutation(
                caller_id,
                &caller,
                &RoleMutation::RemoveRole {
                    target: staff_id,
                    role_priority: locked.role.priority,
                },
            )
            .map_err(AppError::from)
        };

        let removed = self
            .ledger
            .remove_safe(
                actor.tenant_id(),
                actor.vendor_id(),
                staff_id,
                role_id,
                is_self_removal,
                &guard,
            )
            .await?;

        self.permissions
            .invalidate_staff(actor.tenant_id(), removed.vendor_id, staff_id)
            .await;
        self.audit.emit(
            AuditEvent::new(
                actor.tenant_id(),
                actor.vendor_id(),
                AuditAction::RoleRemoved,
                AuditEntityType::RoleAssignment,
                removed.assignment_id.to_string(),
            )
            .performed_by(caller_id)
            .targeting(staff_id)
            .with_old_value(AuditSnapshot::Assignment(removed.clone())),
        );

        Ok(removed)
    }

    /// Marks one active assignment as primary and demotes the others.
    ///
    /// Staff may always re-mark their own primary role.
    pub async fn set_primary_role(
        &self,
        actor: &StaffPrincipal,
        staff_id: StaffId,
        role_id: RoleId,
    ) -> AppResult<RoleAssignment> {
        let caller_id = actor.staff_id();
        let caller = if staff_id == caller_id {
            self.permissions.for_principal(actor).await?
        } else {
            self.permissions
                .require_permission(actor, Permission::RolesAssign)
                .await?
        };

        let guard = |locked: LockedAssignment<'_>| -> AppResult<()> {
            authorize_role_mutation(
                caller_id,
                &caller,
                &RoleMutation::SetPrimary {
                    target: staff_id,
                    role_priority: locked.role.priority,
                },
            )
            .map_err(AppError::from)
        };

        let change = self
            .ledger
            .set_primary(
                actor.tenant_id(),
                actor.vendor_id(),
                staff_id,
                role_id,
                &guard,
            )
            .await?;

        self.permissions
            .invalidate_staff(actor.tenant_id(), change.assignment.vendor_id, staff_id)
            .await;
        let mut event = AuditEvent::new(
            actor.tenant_id(),
            actor.vendor_id(),
            AuditAction::PrimaryRoleChanged,
            AuditEntityType::RoleAssignment,
            change.assignment.assignment_id.to_string(),
        )
        .performed_by(caller_id)
        .targeting(staff_id)
        .with_new_value(AuditSnapshot::PrimaryRole(role_id));
        if let Some(previous_role_id) = change.previous_role_id {
            event = event.with_old_value(AuditSnapshot::PrimaryRole(previous_role_id));
        }
        self.audit.emit(event);

        Ok(change.assignment)
    }

    /// Deactivates assignments that lapsed before `now` and drops the
    /// affected cache entries. Runs without an actor.
    pub async fn expire_lapsed_assignments(
        &self,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<RoleAssignment>> {
        let expired = self.ledger.deactivate_expired(now).await?;

        for assignment in &expired {
            self.permissions
                .invalidate_staff(
                    assignment.tenant_id,
                    assignment.vendor_id,
                    assignment.staff_id,
                )
                .await;
            self.audit.emit(
                AuditEvent::new(
                    assignment.tenant_id,
                    assignment.vendor_id,
                    AuditAction::AssignmentExpired,
                    AuditEntityType::RoleAssignment,
                    assignment.assignment_id.to_string(),
                )
                .targeting(assignment.staff_id)
                .with_old_value(AuditSnapshot::Assignment(assignment.clone())),
            );
        }

        Ok(expired)
    }

    /// Lists a staff member's active assignments, primary first.
    pub async fn list_staff_roles(
        &self,
        actor: &StaffPrincipal,
        staff_id: StaffId,
    ) -> AppResult<Vec<RoleAssignment>> {
        self.require_self_or(actor, staff_id, Permission::StaffView)
            .await?;
        self.ledger
            .list_staff_assignments(actor.tenant_id(), actor.vendor_id(), staff_id, Utc::now())
            .await
    }

    /// Returns a staff member's effective permissions in the actor's scope.
    pub async fn effective_permissions(
        &self,
        actor: &StaffPrincipal,
        staff_id: StaffId,
    ) -> AppResult<EffectivePermissions> {
        self.require_self_or(actor, staff_id, Permission::RolesView)
            .await?;
        self.permissions
            .get(StaffScope {
                tenant_id: actor.tenant_id(),
                vendor_id: actor.vendor_id(),
                staff_id,
            })
            .await
    }

    async fn require_self_or(
        &self,
        actor: &StaffPrincipal,
        staff_id: StaffId,
        permission: Permission,
    ) -> AppResult<()> {
        if actor.staff_id() != staff_id {
            self.permissions
                .require_permission(actor, permission)
                .await?;
        }
        Ok(())
    }
}
