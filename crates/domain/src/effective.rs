//! Effective permission resolution.
//!
//! The fold is total: any set of grants, including none, resolves to a
//! defined decision object.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use staffguard_core::{Capability, StaffId, TenantId, VendorId};

use crate::{
    Permission, PriorityLevel, RoleCapabilities, RoleGrant, RoleId, StaffScope, vendor_visible,
};

/// Resolved capability set and authority ceiling for one staff member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectivePermissions {
    /// Tenant scope.
    pub tenant_id: TenantId,
    /// Vendor context used for resolution.
    pub vendor_id: Option<VendorId>,
    /// Resolved staff member.
    pub staff_id: StaffId,
    /// Union of capability flags of contributing roles.
    pub capabilities: RoleCapabilities,
    /// Highest priority among contributing roles; zero without roles.
    pub max_priority: PriorityLevel,
    /// Highest priority the staff member may assign, inclusive.
    pub assignable_limit: Option<i32>,
    /// Union of catalog permissions of contributing roles.
    pub permissions: BTreeSet<Permission>,
    /// Roles that contributed, in grant order.
    pub role_ids: Vec<RoleId>,
    /// Resolution instant.
    pub computed_at: DateTime<Utc>,
}

impl EffectivePermissions {
    /// Lowest-authority result for a staff member without roles.
    #[must_use]
    pub fn empty(scope: StaffScope, computed_at: DateTime<Utc>) -> Self {
        Self {
            tenant_id: scope.tenant_id,
            vendor_id: scope.vendor_id,
            staff_id: scope.staff_id,
            capabilities: RoleCapabilities::NONE,
            max_priority: PriorityLevel::NONE,
            assignable_limit: None,
            permissions: BTreeSet::new(),
            role_ids: Vec::new(),
            computed_at,
        }
    }

    /// Folds every eligible grant into one decision object.
    ///
    /// A grant contributes only when its assignment belongs to the staff
    /// member in scope, is active and unexpired at `now`, and its role is
    /// active and matches the assignment.
    #[must_use]
    pub fn resolve(scope: StaffScope, grants: &[RoleGrant], now: DateTime<Utc>) -> Self {
        grants
            .iter()
            .filter(|grant| {
                let assignment = &grant.assignment;
                assignment.tenant_id == scope.tenant_id
                    && assignment.staff_id == scope.staff_id
                    && vendor_visible(assignment.vendor_id, scope.vendor_id)
                    && assignment.is_effective_at(now)
                    && assignment.role_id == grant.role.role_id
                    && grant.role.is_active
            })
            .fold(Self::empty(scope, now), |mut resolved, grant| {
                let role = &grant.role;
                resolved.capabilities = resolved.capabilities.union(role.capabilities);
                resolved.max_priority = resolved.max_priority.max(role.priority);
                resolved.assignable_limit = Some(
                    resolved
                        .assignable_limit
                        .map_or(role.assignable_limit(), |limit| {
                            limit.max(role.assignable_limit())
                        }),
                );
                resolved.permissions.extend(role.permissions.iter().copied());
                if !resolved.role_ids.contains(&role.role_id) {
                    resolved.role_ids.push(role.role_id);
                }
                resolved
            })
    }

    /// Returns the cache key this snapshot belongs to.
    #[must_use]
    pub fn scope(&self) -> StaffScope {
        StaffScope {
            tenant_id: self.tenant_id,
            vendor_id: self.vendor_id,
            staff_id: self.staff_id,
        }
    }

    /// Returns whether the catalog permission is granted.
    #[must_use]
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    /// Returns whether the capability flag is set.
    #[must_use]
    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.has(capability)
    }

    /// Returns whether `priority` sits strictly below this principal's ceiling.
    #[must_use]
    pub fn outranks(&self, priority: PriorityLevel) -> bool {
        priority < self.max_priority
    }
}
