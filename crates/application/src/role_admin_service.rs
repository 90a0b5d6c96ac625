use std::collections::BTreeSet;
use std::sync::Arc;

use staffguard_core::{AppResult, NonEmptyString, StaffPrincipal};
use staffguard_domain::{
    EffectivePermissions, Permission, PermissionId, PriorityLevel, RoleCapabilities, RoleDraft,
    RoleSlug, RoleUpdate,
};

use crate::{AuditDispatcher, AuditLogRepository, EffectivePermissionService, RoleRepository};

mod roles;
mod seeding;

#[cfg(test)]
mod tests;

pub use seeding::SeedReport;

/// Input payload for creating custom roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRoleInput {
    /// Slug unique within the tenant and vendor scope.
    pub name: String,
    /// Human-readable label.
    pub display_name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Requested priority level.
    pub priority: i32,
    /// Requested capability flags.
    pub capabilities: RoleCapabilities,
    /// Optional cap on what holders may grant.
    pub max_assignable_priority: Option<i32>,
    /// Catalog permissions to attach.
    pub permission_ids: Vec<PermissionId>,
}

impl CreateRoleInput {
    fn into_draft(self) -> AppResult<RoleDraft> {
        Ok(RoleDraft {
            name: RoleSlug::new(self.name)?,
            display_name: NonEmptyString::new(self.display_name)?,
            description: self.description,
            priority: PriorityLevel::new(self.priority)?,
            capabilities: self.capabilities,
            max_assignable_priority: self
                .max_assignable_priority
                .map(PriorityLevel::new)
                .transpose()?,
            permissions: resolve_permission_ids(&self.permission_ids)?,
        })
    }
}

/// Partial role update. Absent fields stay unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateRoleInput {
    /// New display name.
    pub display_name: Option<String>,
    /// New description; `Some(None)` clears it.
    pub description: Option<Option<String>>,
    /// New priority level.
    pub priority: Option<i32>,
    /// New capability flags.
    pub capabilities: Option<RoleCapabilities>,
    /// New assignable cap; `Some(None)` clears it.
    pub max_assignable_priority: Option<Option<i32>>,
    /// Activation toggle.
    pub is_active: Option<bool>,
}

impl UpdateRoleInput {
    fn into_update(self) -> AppResult<RoleUpdate> {
        Ok(RoleUpdate {
            display_name: self.display_name.map(NonEmptyString::new).transpose()?,
            description: self.description,
            priority: self.priority.map(PriorityLevel::new).transpose()?,
            capabilities: self.capabilities,
            max_assignable_priority: self
                .max_assignable_priority
                .map(|cap| cap.map(PriorityLevel::new).transpose())
                .transpose()?,
            is_active: self.is_active,
        })
    }
}

fn resolve_permission_ids(permission_ids: &[PermissionId]) -> AppResult<BTreeSet<Permission>> {
    permission_ids
        .iter()
        .map(|permission_id| Permission::from_id(*permission_id))
        .collect()
}

/// Application service for role administration.
#[derive(Clone)]
pub struct RoleAdminService {
    permissions: EffectivePermissionService,
    roles: Arc<dyn RoleRepository>,
    audit_log_repository: Arc<dyn AuditLogRepository>,
    audit: AuditDispatcher,
}

impl RoleAdminService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        permissions: EffectivePermissionService,
        roles: Arc<dyn RoleRepository>,
        audit_log_repository: Arc<dyn AuditLogRepository>,
        audit: AuditDispatcher,
    ) -> Self {
        Self {
            permissions,
            roles,
            audit_log_repository,
            audit,
        }
    }

    async fn require(
        &self,
        actor: &StaffPrincipal,
        permission: Permission,
    ) -> AppResult<EffectivePermissions> {
        self.permissions.require_permission(actor, permission).await
    }
}
