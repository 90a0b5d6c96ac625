use super::*;

use staffguard_core::AppError;
use staffguard_domain::{
    AuditAction, AuditEntityType, AuditSnapshot, PermissionDefinition, Role, RoleId,
    RoleMutation, authorize_role_mutation, permission_catalog,
};

use crate::{AuditEvent, AuditLogEntry, AuditLogQuery, RoleDeletion};

impl RoleAdminService {
    /// Returns the static permission catalog.
    pub async fn list_permissions(
        &self,
        actor: &StaffPrincipal,
    ) -> AppResult<Vec<PermissionDefinition>> {
        self.require(actor, Permission::RolesView).await?;
        Ok(permission_catalog())
    }

    /// Returns roles visible from the actor's scope.
    pub async fn list_roles(&self, actor: &StaffPrincipal) -> AppResult<Vec<Role>> {
        self.require(actor, Permission::RolesView).await?;
        self.roles
            .list_roles(actor.tenant_id(), actor.vendor_id())
            .await
    }

    /// Returns one role visible from the actor's scope.
    pub async fn get_role(&self, actor: &StaffPrincipal, role_id: RoleId) -> AppResult<Role> {
        self.require(actor, Permission::RolesView).await?;
        self.roles
            .find_role(actor.tenant_id(), actor.vendor_id(), role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))
    }

    /// Returns active roles the actor could hand out.
    pub async fn list_assignable_roles(&self, actor: &StaffPrincipal) -> AppResult<Vec<Role>> {
        let caller = self.require(actor, Permission::RolesView).await?;
        let roles = self
            .roles
            .list_roles(actor.tenant_id(), actor.vendor_id())
            .await?;

        Ok(roles
            .into_iter()
            .filter(|role| {
                role.is_active
                    && caller.outranks(role.priority)
                    && caller
                        .assignable_limit
                        .is_none_or(|limit| role.priority.value() <= limit)
            })
            .collect())
    }

    /// Creates a custom role strictly below the actor's authority.
    pub async fn create_role(
        &self,
        actor: &StaffPrincipal,
        input: CreateRoleInput,
    ) -> AppResult<Role> {
        let caller = self.require(actor, Permission::RolesManage).await?;
        let draft = input.into_draft()?;

        authorize_role_mutation(
            actor.staff_id(),
            &caller,
            &RoleMutation::CreateRole {
                priority: draft.priority,
                capabilities: draft.capabilities,
                permissions: &draft.permissions,
            },
        )?;

        let role = self
            .roles
            .create_role(Role::from_draft(
                actor.tenant_id(),
                actor.vendor_id(),
                draft,
                false,
            ))
            .await?;

        self.audit.emit(
            AuditEvent::new(
                actor.tenant_id(),
                actor.vendor_id(),
                AuditAction::RoleCreated,
                AuditEntityType::Role,
                role.role_id.to_string(),
            )
            .performed_by(actor.staff_id())
            .with_new_value(AuditSnapshot::Role(role.clone())),
        );

        Ok(role)
    }

    /// Applies a partial update to a role below the actor's authority.
    pub async fn update_role(
        &self,
        actor: &StaffPrincipal,
        role_id: RoleId,
        input: UpdateRoleInput,
    ) -> AppResult<Role> {
        let caller = self.require(actor, Permission::RolesManage).await?;
        let update = input.into_update()?;
        let new_priority = update.priority;
        let new_capabilities = update.capabilities;
        let caller_id = actor.staff_id();

        let guard = |existing: &Role| -> AppResult<()> {
            authorize_role_mutation(
                caller_id,
                &caller,
                &RoleMutation::UpdateRole {
                    existing_priority: existing.priority,
                    existing_capabilities: existing.capabilities,
                    existing_permissions: &existing.permissions,
                    new_priority,
                    new_capabilities,
                    new_permissions: None,
                },
            )
            .map_err(AppError::from)
        };

        let change = self
            .roles
            .update_role(actor.tenant_id(), actor.vendor_id(), role_id, update, &guard)
            .await?;

        self.permissions.invalidate_tenant(actor.tenant_id()).await;
        self.audit.emit(
            AuditEvent::new(
                actor.tenant_id(),
                actor.vendor_id(),
                AuditAction::RoleUpdated,
                AuditEntityType::Role,
                role_id.to_string(),
            )
            .performed_by(caller_id)
            .with_old_value(AuditSnapshot::Role(change.before))
            .with_new_value(AuditSnapshot::Role(change.after.clone())),
        );

        Ok(change.after)
    }

    /// Deletes a role, or deactivates it while assignments still reference it.
    pub async fn delete_role(
        &self,
        actor: &StaffPrincipal,
        role_id: RoleId,
    ) -> AppResult<RoleDeletion> {
        let caller = self.require(actor, Permission::RolesManage).await?;
        let caller_id = actor.staff_id();

        let guard = |existing: &Role| -> AppResult<()> {
            authorize_role_mutation(
                caller_id,
                &caller,
                &RoleMutation::DeleteRole {
                    existing_priority: existing.priority,
                    is_system: existing.is_system,
                },
            )
            .map_err(AppError::from)
        };

        let deletion = self
            .roles
            .delete_role(actor.tenant_id(), actor.vendor_id(), role_id, &guard)
            .await?;

        self.permissions.invalidate_tenant(actor.tenant_id()).await;
        let action = match deletion {
            RoleDeletion::Deleted(_) => AuditAction::RoleDeleted,
            RoleDeletion::Deactivated(_) => AuditAction::RoleDeactivated,
        };
        self.audit.emit(
            AuditEvent::new(
                actor.tenant_id(),
                actor.vendor_id(),
                action,
                AuditEntityType::Role,
                role_id.to_string(),
            )
            .performed_by(caller_id)
            .with_old_value(AuditSnapshot::Role(deletion.role().clone())),
        );

        Ok(deletion)
    }

    /// Replaces a role's full permission set.
    pub async fn set_role_permissions(
        &self,
        actor: &StaffPrincipal,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> AppResult<Role> {
        let caller = self.require(actor, Permission::RolesManage).await?;
        let permissions = resolve_permission_ids(permission_ids)?;
        let caller_id = actor.staff_id();

        let guard = |existing: &Role| -> AppResult<()> {
            authorize_role_mutation(
                caller_id,
                &caller,
                &RoleMutation::UpdateRole {
                    existing_priority: existing.priority,
                    existing_capabilities: existing.capabilities,
                    existing_permissions: &existing.permissions,
                    new_priority: None,
                    new_capabilities: None,
                    new_permissions: Some(&permissions),
                },
            )
            .map_err(AppError::from)
        };

        let change = self
            .roles
            .replace_role_permissions(
                actor.tenant_id(),
                actor.vendor_id(),
                role_id,
                permissions.clone(),
                Some(caller_id),
                &guard,
            )
            .await?;

        self.permissions.invalidate_tenant(actor.tenant_id()).await;
        self.audit.emit(
            AuditEvent::new(
                actor.tenant_id(),
                actor.vendor_id(),
                AuditAction::RolePermissionsChanged,
                AuditEntityType::Role,
                role_id.to_string(),
            )
            .performed_by(caller_id)
            .with_old_value(AuditSnapshot::Permissions(
                change.before.permissions.into_iter().collect(),
            ))
            .with_new_value(AuditSnapshot::Permissions(
                change.after.permissions.iter().copied().collect(),
            )),
        );

        Ok(change.after)
    }

    /// Returns recent audit entries of the actor's tenant.
    pub async fn list_audit_log(
        &self,
        actor: &StaffPrincipal,
        query: AuditLogQuery,
    ) -> AppResult<Vec<AuditLogEntry>> {
        self.require(actor, Permission::AuditView).await?;
        self.audit_log_repository
            .list_recent_entries(actor.tenant_id(), query)
            .await
    }
}
