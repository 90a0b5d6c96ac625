use std::collections::BTreeSet;

use async_trait::async_trait;
use staffguard_application::{RoleChange, RoleDeletion, RoleGuard, RoleRepository};
use staffguard_core::{AppError, AppResult, StaffId, TenantId, VendorId};
use staffguard_domain::{Permission, Role, RoleId, RoleSlug, RoleUpdate, vendor_visible};

use super::InMemoryRbacRepository;

#[async_trait]
impl RoleRepository for InMemoryRbacRepository {
    async fn find_role(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        role_id: RoleId,
    ) -> AppResult<Option<Role>> {
        let state = self.state.read().await;
        Ok(state.visible_role(tenant_id, vendor_id, role_id).cloned())
    }

    async fn find_role_by_name(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        name: &RoleSlug,
    ) -> AppResult<Option<Role>> {
        let state = self.state.read().await;
        Ok(state
            .roles
            .values()
            .filter(|role| {
                role.tenant_id == tenant_id
                    && &role.name == name
                    && vendor_visible(role.vendor_id, vendor_id)
            })
            .max_by_key(|role| role.vendor_id.is_some())
            .cloned())
    }

    async fn list_roles(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
    ) -> AppResult<Vec<Role>> {
        let state = self.state.read().await;
        let mut roles: Vec<Role> = state
            .roles
            .values()
            .filter(|role| role.tenant_id == tenant_id && vendor_visible(role.vendor_id, vendor_id))
            .cloned()
            .collect();
        roles.sort_by(|left, right| {
            right
                .priority
                .cmp(&left.priority)
                .then_with(|| left.name.as_str().cmp(right.name.as_str()))
        });
        Ok(roles)
    }

    async fn create_role(&self, role: Role) -> AppResult<Role> {
        let mut state = self.state.write().await;
        let duplicate = state.roles.values().any(|existing| {
            existing.tenant_id == role.tenant_id
                && existing.vendor_id == role.vendor_id
                && existing.name == role.name
        });
        if duplicate {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists for tenant '{}'",
                role.name.as_str(),
                role.tenant_id
            )));
        }

        state.roles.insert(role.role_id, role.clone());
        Ok(role)
    }

    async fn update_role(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        role_id: RoleId,
        update: RoleUpdate,
        guard: &RoleGuard<'_>,
    ) -> AppResult<RoleChange> {
        let mut state = self.state.write().await;
        let before = state.require_role(tenant_id, vendor_id, role_id)?;
        guard(&before)?;

        let after = before.apply_update(update)?;
        state.roles.insert(role_id, after.clone());
        Ok(RoleChange { before, after })
    }

    async fn replace_role_permissions(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        role_id: RoleId,
        permissions: BTreeSet<Permission>,
        _granted_by: Option<StaffId>,
        guard: &RoleGuard<'_>,
    ) -> AppResult<RoleChange> {
        let mut state = self.state.write().await;
        let before = state.require_role(tenant_id, vendor_id, role_id)?;
        guard(&before)?;

        let after = Role {
            permissions,
            ..before.clone()
        };
        state.roles.insert(role_id, after.clone());
        Ok(RoleChange { before, after })
    }

    async fn delete_role(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        role_id: RoleId,
        guard: &RoleGuard<'_>,
    ) -> AppResult<RoleDeletion> {
        let mut state = self.state.write().await;
        let role = state.require_role(tenant_id, vendor_id, role_id)?;
        guard(&role)?;

        let referenced = state
            .assignments
            .iter()
            .any(|assignment| assignment.role_id == role_id && assignment.is_active);
        if referenced {
            if let Some(stored) = state.roles.get_mut(&role_id) {
                stored.is_active = false;
            }
            return Ok(RoleDeletion::Deactivated(role));
        }

        state.roles.remove(&role_id);
        state
            .assignments
            .retain(|assignment| assignment.role_id != role_id);
        Ok(RoleDeletion::Deleted(role))
    }
}
