use std::collections::BTreeSet;

use async_trait::async_trait;
use staffguard_core::{AppResult, StaffId, TenantId, VendorId};
use staffguard_domain::{Permission, Role, RoleId, RoleSlug, RoleUpdate};

/// Check evaluated against the locked role row before a mutation is applied.
pub type RoleGuard<'a> = dyn Fn(&Role) -> AppResult<()> + Send + Sync + 'a;

/// Role state before and after a committed mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleChange {
    /// State read inside the transaction.
    pub before: Role,
    /// Persisted state.
    pub after: Role,
}

/// Outcome of a role deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleDeletion {
    /// The role had no active assignments and was removed.
    Deleted(Role),
    /// The role is still referenced and was deactivated instead.
    Deactivated(Role),
}

impl RoleDeletion {
    /// Returns the role as it was before deletion.
    #[must_use]
    pub fn role(&self) -> &Role {
        match self {
            Self::Deleted(role) | Self::Deactivated(role) => role,
        }
    }
}

/// Repository port for roles and their permission sets.
///
/// Reads in a vendor context include tenant-wide roles. Mutations lock the
/// role row, run the guard against it and only then apply the change, all
/// in one transaction.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Finds one role visible from the scope.
    async fn find_role(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        role_id: RoleId,
    ) -> AppResult<Option<Role>>;

    /// Finds one role by slug, preferring an exact vendor match.
    async fn find_role_by_name(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        name: &RoleSlug,
    ) -> AppResult<Option<Role>>;

    /// Lists roles visible from the scope ordered by descending priority.
    async fn list_roles(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
    ) -> AppResult<Vec<Role>>;

    /// Persists a new role. Duplicate names in the same scope are conflicts.
    async fn create_role(&self, role: Role) -> AppResult<Role>;

    /// Applies a partial update after the guard accepts the locked row.
    async fn update_role(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        role_id: RoleId,
        update: RoleUpdate,
        guard: &RoleGuard<'_>,
    ) -> AppResult<RoleChange>;

    /// Replaces the full permission set after the guard accepts the locked row.
    async fn replace_role_permissions(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        role_id: RoleId,
        permissions: BTreeSet<Permission>,
        granted_by: Option<StaffId>,
        guard: &RoleGuard<'_>,
    ) -> AppResult<RoleChange>;

    /// Deletes the role, or deactivates it while assignments reference it.
    async fn delete_role(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        role_id: RoleId,
        guard: &RoleGuard<'_>,
    ) -> AppResult<RoleDeletion>;
}
