use async_trait::async_trait;
use staffguard_application::{DepartmentChange, DepartmentRepository, TeamChange};
use staffguard_core::{AppError, AppResult, TenantId, VendorId};
use staffguard_domain::{
    Department, DepartmentForest, DepartmentId, DepartmentUpdate, Team, TeamId, TeamUpdate,
    vendor_visible,
};

use super::{InMemoryRbacRepository, RbacState};

impl RbacState {
    fn require_active_department(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        department_id: DepartmentId,
    ) -> AppResult<Department> {
        self.visible_department(tenant_id, vendor_id, department_id)
            .cloned()
            .ok_or_else(|| {
                AppError::NotFound(format!("department '{department_id}' does not exist"))
            })
    }

    fn require_parent(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        parent_id: DepartmentId,
    ) -> AppResult<()> {
        if self
            .visible_department(tenant_id, vendor_id, parent_id)
            .is_none()
        {
            return Err(AppError::Validation(format!(
                "parent department '{parent_id}' does not exist"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl DepartmentRepository for InMemoryRbacRepository {
    async fn list_departments(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
    ) -> AppResult<Vec<Department>> {
        let state = self.state.read().await;
        let mut departments: Vec<Department> = state
            .departments
            .values()
            .filter(|department| {
                department.tenant_id == tenant_id
                    && department.is_active
                    && vendor_visible(department.vendor_id, vendor_id)
            })
            .cloned()
            .collect();
        departments.sort_by(|left, right| left.name.as_str().cmp(right.name.as_str()));
        Ok(departments)
    }

    async fn find_department(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        department_id: DepartmentId,
    ) -> AppResult<Option<Department>> {
        let state = self.state.read().await;
        Ok(state
            .visible_department(tenant_id, vendor_id, department_id)
            .cloned())
    }

    async fn department_forest(&self, tenant_id: TenantId) -> AppResult<DepartmentForest> {
        Ok(self.state.read().await.forest(tenant_id))
    }

    async fn create_department(&self, department: Department) -> AppResult<Department> {
        let mut state = self.state.write().await;
        if let Some(parent_id) = department.parent_department_id {
            state.require_parent(department.tenant_id, department.vendor_id, parent_id)?;
        }

        state
            .departments
            .insert(department.department_id, department.clone());
        Ok(department)
    }

    async fn update_department(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        department_id: DepartmentId,
        update: DepartmentUpdate,
    ) -> AppResult<DepartmentChange> {
        let mut state = self.state.write().await;
        let before = state.require_active_department(tenant_id, vendor_id, department_id)?;

        if let Some(Some(parent_id)) = update.parent_department_id {
            state.require_parent(tenant_id, vendor_id, parent_id)?;
            if state.forest(tenant_id).would_create_cycle(department_id, parent_id) {
                return Err(AppError::CycleDetected(format!(
                    "department '{department_id}' cannot be placed under '{parent_id}'"
                )));
            }
        }

        let after = before.with_update(update);
        state.departments.insert(department_id, after.clone());
        Ok(DepartmentChange { before, after })
    }

    async fn delete_department(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        department_id: DepartmentId,
    ) -> AppResult<Department> {
        let mut state = self.state.write().await;
        let department = state.require_active_department(tenant_id, vendor_id, department_id)?;

        let team_count = state.active_team_count(tenant_id, department_id);
        if team_count > 0 {
            return Err(AppError::HasDependentTeams {
                department_id: department_id.to_string(),
                team_count,
            });
        }

        let deleted = Department {
            is_active: false,
            ..department
        };
        state.departments.insert(department_id, deleted.clone());
        Ok(deleted)
    }

    async fn list_teams(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        department_id: Option<DepartmentId>,
    ) -> AppResult<Vec<Team>> {
        let state = self.state.read().await;
        let mut teams: Vec<Team> = state
            .teams
            .values()
            .filter(|team| {
                team.tenant_id == tenant_id
                    && team.is_active
                    && vendor_visible(team.vendor_id, vendor_id)
                    && department_id.is_none_or(|department_id| team.department_id == department_id)
            })
            .cloned()
            .collect();
        teams.sort_by(|left, right| left.name.as_str().cmp(right.name.as_str()));
        Ok(teams)
    }

    async fn create_team(&self, team: Team) -> AppResult<Team> {
        let mut state = self.state.write().await;
        if state
            .visible_department(team.tenant_id, team.vendor_id, team.department_id)
            .is_none()
        {
            return Err(AppError::Validation(format!(
                "department '{}' does not exist",
                team.department_id
            )));
        }

        state.teams.insert(team.team_id, team.clone());
        Ok(team)
    }

    async fn update_team(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        team_id: TeamId,
        update: TeamUpdate,
    ) -> AppResult<TeamChange> {
        let mut state = self.state.write().await;
        let before = state
            .teams
            .get(&team_id)
            .filter(|team| {
                team.tenant_id == tenant_id
                    && team.is_active
                    && vendor_visible(team.vendor_id, vendor_id)
            })
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("team '{team_id}' does not exist")))?;

        if let Some(department_id) = update.department_id
            && state
                .visible_department(tenant_id, vendor_id, department_id)
                .is_none()
        {
            return Err(AppError::Validation(format!(
                "department '{department_id}' does not exist"
            )));
        }

        let after = before.with_update(update);
        state.teams.insert(team_id, after.clone());
        Ok(TeamChange { before, after })
    }

    async fn delete_team(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        team_id: TeamId,
    ) -> AppResult<Team> {
        let mut state = self.state.write().await;
        let team = state
            .teams
            .get_mut(&team_id)
            .filter(|team| {
                team.tenant_id == tenant_id
                    && team.is_active
                    && vendor_visible(team.vendor_id, vendor_id)
            })
            .ok_or_else(|| AppError::NotFound(format!("team '{team_id}' does not exist")))?;
        team.is_active = false;
        Ok(team.clone())
    }
}
