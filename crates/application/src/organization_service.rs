use std::sync::Arc;

use staffguard_core::{AppError, AppResult, NonEmptyString, StaffId, StaffPrincipal};
use staffguard_domain::{
    AuditAction, AuditEntityType, AuditSnapshot, Department, DepartmentHierarchy, DepartmentId,
    DepartmentUpdate, Permission, RoleId, Team, TeamId, TeamUpdate,
};

use crate::{AuditDispatcher, AuditEvent, DepartmentRepository, EffectivePermissionService};


/// Input payload for creating a department.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateDepartmentInput {
    /// Display name.
    pub name: String,
    /// Optional short code.
    pub code: Option<String>,
    /// Optional description.
    pub description: Option<String>,
    /// Optional parent in the same tenant.
    pub parent_department_id: Option<DepartmentId>,
    /// Optional department head.
    pub head_staff_id: Option<StaffId>,
}

/// Input payload for creating a team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTeamInput {
    /// Owning department.
    pub department_id: DepartmentId,
    /// Display name.
    pub name: String,
    /// Optional short code.
    pub code: Option<String>,
    /// Optional description.
    pub description: Option<String>,
    /// Optional team lead.
    pub team_lead_id: Option<StaffId>,
    /// Role suggested for new members.
    pub default_role_id: Option<RoleId>,
    /// Optional member limit.
    pub max_capacity: Option<u32>,
}

/// Application service for departments and teams.
#[derive(Clone)]
pub struct OrganizationService {
    permissions: EffectivePermissionService,
    repository: Arc<dyn DepartmentRepository>,
    audit: AuditDispatcher,
}

impl OrganizationService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        permissions: EffectivePermissionService,
        repository: Arc<dyn DepartmentRepository>,
        audit: AuditDispatcher,
    ) -> Self {
        Self {
            permissions,
            repository,
            audit,
        }
    }

    /// Lists active departments visible from the actor's scope.
    pub async fn list_departments(&self, actor: &StaffPrincipal) -> AppResult<Vec<Department>> {
        self.permissions
            .require_permission(actor, Permission::DepartmentsView)
            .await?;
        self.repository
            .list_departments(actor.tenant_id(), actor.vendor_id())
            .await
    }

    /// Lists the visible department trees with their active teams.
    pub async fn department_hierarchy(
        &self,
        actor: &StaffPrincipal,
    ) -> AppResult<Vec<DepartmentHierarchy>> {
        self.permissions
            .require_permission(actor, Permission::DepartmentsView)
            .await?;
        let departments = self
            .repository
            .list_departments(actor.tenant_id(), actor.vendor_id())
            .await?;
        let teams = self
            .repository
            .list_teams(actor.tenant_id(), actor.vendor_id(), None)
            .await?;
        Ok(DepartmentHierarchy::build(departments, teams))
    }

    /// Returns whether reparenting `department_id` under `proposed_parent`
    /// would close a loop.
    pub async fn would_create_cycle(
        &self,
        actor: &StaffPrincipal,
        department_id: DepartmentId,
        proposed_parent: DepartmentId,
    ) -> AppResult<bool> {
        self.permissions
            .require_permission(actor, Permission::DepartmentsView)
            .await?;
        let forest = self.repository.department_forest(actor.tenant_id()).await?;
        Ok(forest.would_create_cycle(department_id, proposed_parent))
    }

    /// Creates a department.
    pub async fn create_department(
        &self,
        actor: &StaffPrincipal,
        input: CreateDepartmentInput,
    ) -> AppResult<Department> {
        self.permissions
            .require_permission(actor, Permission::DepartmentsManage)
            .await?;
        if let Some(parent_id) = input.parent_department_id {
            self.require_department(actor, parent_id).await?;
        }

        let department = self
            .repository
            .create_department(Department {
                department_id: DepartmentId::new(),
                tenant_id: actor.tenant_id(),
                vendor_id: actor.vendor_id(),
                name: NonEmptyString::new(input.name)?,
                code: input.code,
                description: input.description,
                parent_department_id: input.parent_department_id,
                head_staff_id: input.head_staff_id,
                is_active: true,
            })
            .await?;

        self.audit.emit(
            actor_event(
                actor,
                AuditAction::DepartmentCreated,
                AuditEntityType::Department,
                department.department_id.to_string(),
            )
            .with_new_value(AuditSnapshot::Department(department.clone())),
        );

        Ok(department)
    }

    /// Updates a department. A new parent is cycle-checked inside the
    /// repository transaction.
    pub async fn update_department(
        &self,
        actor: &StaffPrincipal,
        department_id: DepartmentId,
        update: DepartmentUpdate,
    ) -> AppResult<Department> {
        self.permissions
            .require_permission(actor, Permission::DepartmentsManage)
            .await?;
        if let Some(Some(parent_id)) = update.parent_department_id {
            self.require_department(actor, parent_id).await?;
        }

        let change = self
            .repository
            .update_department(actor.tenant_id(), actor.vendor_id(), department_id, update)
            .await?;

        self.audit.emit(
            actor_event(
                actor,
                AuditAction::DepartmentUpdated,
                AuditEntityType::Department,
                department_id.to_string(),
            )
            .with_old_value(AuditSnapshot::Department(change.before))
            .with_new_value(AuditSnapshot::Department(change.after.clone())),
        );

        Ok(change.after)
    }

    /// Deletes a department that has no active teams.
    pub async fn delete_department(
        &self,
        actor: &StaffPrincipal,
        department_id: DepartmentId,
    ) -> AppResult<Department> {
        self.permissions
            .require_permission(actor, Permission::DepartmentsManage)
            .await?;

        let department = self
            .repository
            .delete_department(actor.tenant_id(), actor.vendor_id(), department_id)
            .await?;

        self.audit.emit(
            actor_event(
                actor,
                AuditAction::DepartmentDeleted,
                AuditEntityType::Department,
                department_id.to_string(),
            )
            .with_old_value(AuditSnapshot::Department(department.clone())),
        );

        Ok(department)
    }

    /// Lists active teams, optionally within one department.
    pub async fn list_teams(
        &self,
        actor: &StaffPrincipal,
        department_id: Option<DepartmentId>,
    ) -> AppResult<Vec<Team>> {
        self.permissions
            .require_permission(actor, Permission::TeamsView)
            .await?;
        self.repository
            .list_teams(actor.tenant_id(), actor.vendor_id(), department_id)
            .await
    }

    /// Creates a team inside an existing department.
    pub async fn create_team(
        &self,
        actor: &StaffPrincipal,
        input: CreateTeamInput,
    ) -> AppResult<Team> {
        self.permissions
            .require_permission(actor, Permission::TeamsManage)
            .await?;
        validate_capacity(input.max_capacity)?;
        self.require_department(actor, input.department_id).await?;

        let team = self
            .repository
            .create_team(Team {
                team_id: TeamId::new(),
                tenant_id: actor.tenant_id(),
                vendor_id: actor.vendor_id(),
                department_id: input.department_id,
                name: NonEmptyString::new(input.name)?,
                code: input.code,
                description: input.description,
                team_lead_id: input.team_lead_id,
                default_role_id: input.default_role_id,
                max_capacity: input.max_capacity,
                is_active: true,
            })
            .await?;

        self.audit.emit(
            actor_event(
                actor,
                AuditAction::TeamCreated,
                AuditEntityType::Team,
                team.team_id.to_string(),
            )
            .with_new_value(AuditSnapshot::Team(team.clone())),
        );

        Ok(team)
    }

    /// Updates a team; moving it requires the target department to exist.
    pub async fn update_team(
        &self,
        actor: &StaffPrincipal,
        team_id: TeamId,
        update: TeamUpdate,
    ) -> AppResult<Team> {
        self.permissions
            .require_permission(actor, Permission::TeamsManage)
            .await?;
        if let Some(max_capacity) = update.max_capacity {
            validate_capacity(max_capacity)?;
        }
        if let Some(department_id) = update.department_id {
            self.require_department(actor, department_id).await?;
        }

        let change = self
            .repository
            .update_team(actor.tenant_id(), actor.vendor_id(), team_id, update)
            .await?;

        self.audit.emit(
            actor_event(
                actor,
                AuditAction::TeamUpdated,
                AuditEntityType::Team,
                team_id.to_string(),
            )
            .with_old_value(AuditSnapshot::Team(change.before))
            .with_new_value(AuditSnapshot::Team(change.after.clone())),
        );

        Ok(change.after)
    }

    /// Deactivates a team.
    pub async fn delete_team(&self, actor: &StaffPrincipal, team_id: TeamId) -> AppResult<Team> {
        self.permissions
            .require_permission(actor, Permission::TeamsManage)
            .await?;

        let team = self
            .repository
            .delete_team(actor.tenant_id(), actor.vendor_id(), team_id)
            .await?;

        self.audit.emit(
            actor_event(
                actor,
                AuditAction::TeamDeleted,
                AuditEntityType::Team,
                team_id.to_string(),
            )
            .with_old_value(AuditSnapshot::Team(team.clone())),
        );

        Ok(team)
    }

    async fn require_department(
        &self,
        actor: &StaffPrincipal,
        department_id: DepartmentId,
    ) -> AppResult<Department> {
        self.repository
            .find_department(actor.tenant_id(), actor.vendor_id(), department_id)
            .await?
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "department '{department_id}' does not exist in tenant '{}'",
                    actor.tenant_id()
                ))
            })
    }
}

fn actor_event(
    actor: &StaffPrincipal,
    action: AuditAction,
    entity_type: AuditEntityType,
    entity_id: String,
) -> AuditEvent {
    AuditEvent::new(
        actor.tenant_id(),
        actor.vendor_id(),
        action,
        entity_type,
        entity_id,
    )
    .performed_by(actor.staff_id())
}

fn validate_capacity(max_capacity: Option<u32>) -> AppResult<()> {
    if max_capacity == Some(0) {
        return Err(AppError::Validation(
            "team capacity must be positive when set".to_owned(),
        ));
    }
    Ok(())
}
