use async_trait::async_trait;
use chrono::{DateTime, Utc};
use staffguard_core::{AppResult, StaffId, TenantId, VendorId};
use staffguard_domain::{NewAssignment, Role, RoleAssignment, RoleGrant, RoleId};

/// State read under the staff member's assignment lock.
#[derive(Debug, Clone, Copy)]
pub struct LockedAssignment<'a> {
    /// Role targeted by the mutation.
    pub role: &'a Role,
    /// Whether the staff member already holds an active assignment for the role.
    pub already_assigned: bool,
}

/// Check evaluated inside the ledger transaction before a mutation is applied.
pub type AssignmentGuard<'a> = dyn Fn(LockedAssignment<'_>) -> AppResult<()> + Send + Sync + 'a;

/// Result of re-marking the primary assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryRoleChange {
    /// Role previously marked primary, if any.
    pub previous_role_id: Option<RoleId>,
    /// Assignment now marked primary.
    pub assignment: RoleAssignment,
}

/// Ledger port for role assignments.
///
/// Every mutation runs in one transaction that serializes on the staff
/// member's assignments, so duplicate and last-role checks never see a
/// stale count.
#[async_trait]
pub trait AssignmentLedger: Send + Sync {
    /// Lists active, unexpired grants visible from the scope.
    async fn list_active_grants(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        staff_id: StaffId,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<RoleGrant>>;

    /// Lists active, unexpired assignments, primary first then oldest first.
    async fn list_staff_assignments(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        staff_id: StaffId,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<RoleAssignment>>;

    /// Creates an assignment. Fails with `NotFound` for unknown roles and
    /// `Validation` for inactive roles before the guard runs.
    async fn assign(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        assignment: NewAssignment,
        guard: &AssignmentGuard<'_>,
    ) -> AppResult<RoleAssignment>;

    /// Deactivates one assignment. Self-removal of the last active assignment
    /// fails with `CANNOT_REMOVE_LAST_ROLE` before the guard runs and leaves
    /// the ledger unchanged.
    async fn remove_safe(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        staff_id: StaffId,
        role_id: RoleId,
        is_self_removal: bool,
        guard: &AssignmentGuard<'_>,
    ) -> AppResult<RoleAssignment>;

    /// Marks exactly one active assignment primary and demotes the others.
    async fn set_primary(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        staff_id: StaffId,
        role_id: RoleId,
        guard: &AssignmentGuard<'_>,
    ) -> AppResult<PrimaryRoleChange>;

    /// Deactivates assignments whose expiry has passed and returns them.
    async fn deactivate_expired(&self, now: DateTime<Utc>) -> AppResult<Vec<RoleAssignment>>;
}
