use async_trait::async_trait;
use chrono::{DateTime, Utc};
use staffguard_application::{
    AssignmentGuard, AssignmentLedger, LockedAssignment, PrimaryRoleChange,
};
use staffguard_core::{AppError, AppResult, DenialReason, StaffId, TenantId, VendorId};
use staffguard_domain::{NewAssignment, RoleAssignment, RoleGrant, RoleId, vendor_visible};

use super::{InMemoryRbacRepository, RbacState};

fn is_visible_effective(
    assignment: &RoleAssignment,
    tenant_id: TenantId,
    vendor_id: Option<VendorId>,
    staff_id: StaffId,
    now: DateTime<Utc>,
) -> bool {
    assignment.tenant_id == tenant_id
        && assignment.staff_id == staff_id
        && vendor_visible(assignment.vendor_id, vendor_id)
        && assignment.is_effective_at(now)
}

impl RbacState {
    fn effective_position(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        staff_id: StaffId,
        role_id: RoleId,
        now: DateTime<Utc>,
    ) -> AppResult<usize> {
        self.assignments
            .iter()
            .position(|assignment| {
                assignment.role_id == role_id
                    && is_visible_effective(assignment, tenant_id, vendor_id, staff_id, now)
            })
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "staff member '{staff_id}' holds no active assignment for role '{role_id}'"
                ))
            })
    }

    fn demote_primary(&mut self, tenant_id: TenantId, staff_id: StaffId) -> Option<RoleId> {
        let mut previous = None;
        for assignment in self.assignments.iter_mut().filter(|assignment| {
            assignment.tenant_id == tenant_id
                && assignment.staff_id == staff_id
                && assignment.is_primary
        }) {
            if assignment.is_active {
                previous = Some(assignment.role_id);
            }
            assignment.is_primary = false;
        }
        previous
    }
}

#[async_trait]
impl AssignmentLedger for InMemoryRbacRepository {
    async fn list_active_grants(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        staff_id: StaffId,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<RoleGrant>> {
        let state = self.state.read().await;
        Ok(state
            .assignments
            .iter()
            .filter(|assignment| {
                is_visible_effective(assignment, tenant_id, vendor_id, staff_id, now)
            })
            .filter_map(|assignment| {
                state.roles.get(&assignment.role_id).map(|role| RoleGrant {
                    assignment: assignment.clone(),
                    role: role.clone(),
                })
            })
            .collect())
    }

    async fn list_staff_assignments(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        staff_id: StaffId,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<RoleAssignment>> {
        let state = self.state.read().await;
        let mut assignments: Vec<RoleAssignment> = state
            .assignments
            .iter()
            .filter(|assignment| {
                is_visible_effective(assignment, tenant_id, vendor_id, staff_id, now)
            })
            .cloned()
            .collect();
        assignments.sort_by_key(|assignment| (!assignment.is_primary, assignment.assigned_at));
        Ok(assignments)
    }

    async fn assign(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        assignment: NewAssignment,
        guard: &AssignmentGuard<'_>,
    ) -> AppResult<RoleAssignment> {
        let now = Utc::now();
        let mut state = self.state.write().await;
        let role = state.require_role(tenant_id, vendor_id, assignment.role_id)?;
        if !role.is_active {
            return Err(AppError::Validation(format!(
                "role '{}' is inactive",
                role.name.as_str()
            )));
        }

        let same_pair = |existing: &RoleAssignment| {
            existing.tenant_id == tenant_id
                && existing.staff_id == assignment.staff_id
                && existing.role_id == assignment.role_id
        };
        let already_assigned = state
            .assignments
            .iter()
            .any(|existing| same_pair(existing) && existing.is_effective_at(now));
        guard(LockedAssignment {
            role: &role,
            already_assigned,
        })?;
        if already_assigned {
            return Err(DenialReason::DuplicateAssignment.into());
        }

        // Lapsed rows still flagged active are retired only once the grant goes through.
        for lapsed in state
            .assignments
            .iter_mut()
            .filter(|existing| same_pair(&**existing) && existing.is_active)
        {
            lapsed.is_active = false;
            lapsed.is_primary = false;
        }

        if assignment.is_primary {
            state.demote_primary(tenant_id, assignment.staff_id);
        }
        let created = assignment.into_assignment(tenant_id, vendor_id, now);
        state.assignments.push(created.clone());
        Ok(created)
    }

    async fn remove_safe(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        staff_id: StaffId,
        role_id: RoleId,
        is_self_removal: bool,
        guard: &AssignmentGuard<'_>,
    ) -> AppResult<RoleAssignment> {
        let now = Utc::now();
        let mut state = self.state.write().await;
        let role = state.require_role(tenant_id, vendor_id, role_id)?;
        let position = state.effective_position(tenant_id, vendor_id, staff_id, role_id, now)?;

        let remaining = state
            .assignments
            .iter()
            .filter(|assignment| {
                is_visible_effective(assignment, tenant_id, vendor_id, staff_id, now)
            })
            .count();
        if is_self_removal && remaining <= 1 {
            return Err(DenialReason::LastRoleRemoval.into());
        }

        guard(LockedAssignment {
            role: &role,
            already_assigned: true,
        })?;

        let removed = &mut state.assignments[position];
        removed.is_active = false;
        removed.is_primary = false;
        Ok(removed.clone())
    }

    async fn set_primary(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        staff_id: StaffId,
        role_id: RoleId,
        guard: &AssignmentGuard<'_>,
    ) -> AppResult<PrimaryRoleChange> {
        let now = Utc::now();
        let mut state = self.state.write().await;
        let role = state.require_role(tenant_id, vendor_id, role_id)?;
        let position = state.effective_position(tenant_id, vendor_id, staff_id, role_id, now)?;
        guard(LockedAssignment {
            role: &role,
            already_assigned: true,
        })?;

        let previous_role_id = state.demote_primary(tenant_id, staff_id);
        let promoted = &mut state.assignments[position];
        promoted.is_primary = true;
        Ok(PrimaryRoleChange {
            previous_role_id,
            assignment: promoted.clone(),
        })
    }

    async fn deactivate_expired(&self, now: DateTime<Utc>) -> AppResult<Vec<RoleAssignment>> {
        let mut state = self.state.write().await;
        let mut expired = Vec::new();
        for assignment in state.assignments.iter_mut().filter(|assignment| {
            assignment.is_active && assignment.expires_at.is_some_and(|at| at <= now)
        }) {
            assignment.is_active = false;
            assignment.is_primary = false;
            expired.push(assignment.clone());
        }
        Ok(expired)
    }
}
