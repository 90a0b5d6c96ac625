use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use staffguard_core::{NonEmptyString, StaffId, TenantId, VendorId};
use uuid::Uuid;

use crate::{Role, RoleId};

staffguard_core::uuid_identifier!(
    /// Unique identifier for a role assignment.
    AssignmentId
);

/// Narrower context an assignment applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssignmentScope {
    /// Scope kind, for example `warehouse` or `store`.
    pub kind: NonEmptyString,
    /// Optional resource the scope points at.
    pub resource_id: Option<Uuid>,
}

/// Link between one staff member and one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    /// Stable identifier.
    pub assignment_id: AssignmentId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Vendor context of the assignment.
    pub vendor_id: Option<VendorId>,
    /// Assigned staff member.
    pub staff_id: StaffId,
    /// Assigned role.
    pub role_id: RoleId,
    /// Optional narrower scope.
    pub scope: Option<AssignmentScope>,
    /// Expiry instant, after which the assignment no longer counts.
    pub expires_at: Option<DateTime<Utc>>,
    /// Informational primary marker.
    pub is_primary: bool,
    /// Removed assignments are deactivated, never deleted.
    pub is_active: bool,
    /// Staff member who created the assignment; absent for system sync.
    pub assigned_by: Option<StaffId>,
    /// Creation instant.
    pub assigned_at: DateTime<Utc>,
    /// Free-form notes.
    pub notes: Option<String>,
}

impl RoleAssignment {
    /// Returns whether the assignment is active and unexpired at `now`.
    #[must_use]
    pub fn is_effective_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at.is_none_or(|expires_at| expires_at > now)
    }
}

/// Input for creating one assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAssignment {
    /// Staff member receiving the role.
    pub staff_id: StaffId,
    /// Role being assigned.
    pub role_id: RoleId,
    /// Optional narrower scope.
    pub scope: Option<AssignmentScope>,
    /// Optional expiry.
    pub expires_at: Option<DateTime<Utc>>,
    /// Marks the new assignment as primary and demotes the others.
    pub is_primary: bool,
    /// Acting staff member; `None` for system-initiated assignments.
    pub assigned_by: Option<StaffId>,
    /// Free-form notes.
    pub notes: Option<String>,
}

impl NewAssignment {
    /// Materializes the assignment record.
    #[must_use]
    pub fn into_assignment(
        self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        assigned_at: DateTime<Utc>,
    ) -> RoleAssignment {
        RoleAssignment {
            assignment_id: AssignmentId::new(),
            tenant_id,
            vendor_id,
            staff_id: self.staff_id,
            role_id: self.role_id,
            scope: self.scope,
            expires_at: self.expires_at,
            is_primary: self.is_primary,
            is_active: true,
            assigned_by: self.assigned_by,
            assigned_at,
            notes: self.notes,
        }
    }
}

/// Assignment joined with its role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGrant {
    /// Assignment row.
    pub assignment: RoleAssignment,
    /// Role the assignment points at.
    pub role: Role,
}

/// Identifies one cached effective-permission entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StaffScope {
    /// Tenant scope.
    pub tenant_id: TenantId,
    /// Vendor context, if any.
    pub vendor_id: Option<VendorId>,
    /// Staff member.
    pub staff_id: StaffId,
}

/// Returns whether a row owned by `row_vendor` is visible from `context`.
///
/// Vendor contexts see their own rows plus tenant-wide rows; the tenant
/// context sees tenant-wide rows only.
#[must_use]
pub fn vendor_visible(row_vendor: Option<VendorId>, context: Option<VendorId>) -> bool {
    match (row_vendor, context) {
        (None, _) => true,
        (Some(row_vendor), Some(context)) => row_vendor == context,
        (Some(_), None) => false,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use staffguard_core::{StaffId, TenantId, VendorId};

    use super::{NewAssignment, vendor_visible};
    use crate::RoleId;

    #[test]
    fn expired_assignment_is_not_effective() {
        let now = Utc::now();
        let mut assignment = NewAssignment {
            staff_id: StaffId::new(),
            role_id: RoleId::new(),
            scope: None,
            expires_at: Some(now - Duration::minutes(1)),
            is_primary: false,
            assigned_by: None,
            notes: None,
        }
        .into_assignment(TenantId::new(), None, now);

        assert!(!assignment.is_effective_at(now));

        assignment.expires_at = Some(now + Duration::minutes(1));
        assert!(assignment.is_effective_at(now));

        assignment.is_active = false;
        assert!(!assignment.is_effective_at(now));
    }

    #[test]
    fn tenant_rows_are_visible_in_vendor_context() {
        let vendor = VendorId::new();
        assert!(vendor_visible(None, Some(vendor)));
        assert!(vendor_visible(Some(vendor), Some(vendor)));
        assert!(!vendor_visible(Some(VendorId::new()), Some(vendor)));
        assert!(!vendor_visible(Some(vendor), None));
    }
}
