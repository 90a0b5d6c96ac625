use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use staffguard_application::StaffDirectory;
use staffguard_core::{AppError, AppResult, StaffId, TenantId, VendorId};
use staffguard_domain::{
    Department, DepartmentForest, DepartmentId, Role, RoleAssignment, RoleId, Team, TeamId,
    vendor_visible,
};
use tokio::sync::RwLock;

mod assignments;
mod organization;
mod roles;


#[derive(Debug, Default)]
struct RbacState {
    roles: HashMap<RoleId, Role>,
    assignments: Vec<RoleAssignment>,
    staff: HashSet<(TenantId, StaffId)>,
    departments: HashMap<DepartmentId, Department>,
    teams: HashMap<TeamId, Team>,
}

impl RbacState {
    fn visible_role(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        role_id: RoleId,
    ) -> Option<&Role> {
        self.roles.get(&role_id).filter(|role| {
            role.tenant_id == tenant_id && vendor_visible(role.vendor_id, vendor_id)
        })
    }

    fn require_role(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        role_id: RoleId,
    ) -> AppResult<Role> {
        self.visible_role(tenant_id, vendor_id, role_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' does not exist")))
    }

    fn visible_department(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        department_id: DepartmentId,
    ) -> Option<&Department> {
        self.departments.get(&department_id).filter(|department| {
            department.tenant_id == tenant_id
                && department.is_active
                && vendor_visible(department.vendor_id, vendor_id)
        })
    }

    fn forest(&self, tenant_id: TenantId) -> DepartmentForest {
        DepartmentForest::from_links(
            self.departments
                .values()
                .filter(|department| department.tenant_id == tenant_id && department.is_active)
                .map(|department| (department.department_id, department.parent_department_id)),
        )
    }

    fn active_team_count(&self, tenant_id: TenantId, department_id: DepartmentId) -> u64 {
        self.teams
            .values()
            .filter(|team| {
                team.tenant_id == tenant_id && team.department_id == department_id && team.is_active
            })
            .count() as u64
    }
}

/// In-memory RBAC store implementing every repository port.
///
/// One lock covers roles, assignments and the organization tree so that
/// each mutation observes and changes a consistent state.
#[derive(Debug, Default)]
pub struct InMemoryRbacRepository {
    state: RwLock<RbacState>,
}

impl InMemoryRbacRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an active staff member in a tenant.
    pub async fn register_staff(&self, tenant_id: TenantId, staff_id: StaffId) {
        self.state.write().await.staff.insert((tenant_id, staff_id));
    }

    /// Marks a staff member inactive.
    pub async fn deactivate_staff(&self, tenant_id: TenantId, staff_id: StaffId) {
        self.state.write().await.staff.remove(&(tenant_id, staff_id));
    }
}

#[async_trait]
impl StaffDirectory for InMemoryRbacRepository {
    async fn staff_exists(&self, tenant_id: TenantId, staff_id: StaffId) -> AppResult<bool> {
        Ok(self.state.read().await.staff.contains(&(tenant_id, staff_id)))
    }
}
