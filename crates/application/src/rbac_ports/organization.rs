use async_trait::async_trait;
use staffguard_core::{AppResult, TenantId, VendorId};
use staffguard_domain::{
    Department, DepartmentForest, DepartmentId, DepartmentUpdate, Team, TeamId, TeamUpdate,
};

/// Department state before and after a committed update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartmentChange {
    /// State read inside the transaction.
    pub before: Department,
    /// Persisted state.
    pub after: Department,
}

/// Team state before and after a committed update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamChange {
    /// State read inside the transaction.
    pub before: Team,
    /// Persisted state.
    pub after: Team,
}

/// Repository port for departments and teams.
#[async_trait]
pub trait DepartmentRepository: Send + Sync {
    /// Lists active departments visible from the scope.
    async fn list_departments(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
    ) -> AppResult<Vec<Department>>;

    /// Finds one active department visible from the scope.
    async fn find_department(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        department_id: DepartmentId,
    ) -> AppResult<Option<Department>>;

    /// Returns the parent relation of every active department in the tenant.
    async fn department_forest(&self, tenant_id: TenantId) -> AppResult<DepartmentForest>;

    /// Persists a new department. The parent, when set, must be active and visible.
    async fn create_department(&self, department: Department) -> AppResult<Department>;

    /// Applies an update. Reparenting re-checks acyclicity under a tenant-wide
    /// lock and fails with `CycleDetected`.
    async fn update_department(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        department_id: DepartmentId,
        update: DepartmentUpdate,
    ) -> AppResult<DepartmentChange>;

    /// Deactivates a department with no active teams; otherwise fails with
    /// `HasDependentTeams` and leaves the row unchanged.
    async fn delete_department(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        department_id: DepartmentId,
    ) -> AppResult<Department>;

    /// Lists active teams, optionally for one department.
    async fn list_teams(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        department_id: Option<DepartmentId>,
    ) -> AppResult<Vec<Team>>;

    /// Persists a new team under an active department.
    async fn create_team(&self, team: Team) -> AppResult<Team>;

    /// Applies a team update. Moving teams requires an active target department.
    async fn update_team(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        team_id: TeamId,
        update: TeamUpdate,
    ) -> AppResult<TeamChange>;

    /// Deactivates a team.
    async fn delete_team(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        team_id: TeamId,
    ) -> AppResult<Team>;
}
