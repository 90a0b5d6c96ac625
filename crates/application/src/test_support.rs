//! Fakes shared by application service tests.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use staffguard_core::{
    AppError, AppResult, DenialReason, NonEmptyString, StaffId, StaffPrincipal, TenantId, VendorId,
};
use staffguard_domain::{
    Department, DepartmentForest, DepartmentId, DepartmentUpdate, EffectivePermissions,
    NewAssignment, Permission, PriorityLevel, Role, RoleAssignment, RoleCapabilities, RoleDraft,
    RoleGrant, RoleId, RoleSlug, RoleUpdate, StaffScope, Team, TeamId, TeamUpdate,
    vendor_visible,
};

use crate::{
    AssignmentGuard, AssignmentLedger, AuditDispatcher, AuditDispatcherSettings, AuditDrain,
    AuditEvent, AuditLogEntry, AuditLogQuery, AuditLogRepository, AuditRepository,
    DepartmentChange, DepartmentRepository, EffectivePermissionService, LockedAssignment,
    PermissionCache, PermissionCacheSettings, PrimaryRoleChange, RoleChange, RoleDeletion,
    RoleGuard, RoleRepository, StaffDirectory, TeamChange,
};

#[derive(Default)]
pub(crate) struct FakeState {
    pub(crate) roles: Vec<Role>,
    pub(crate) assignments: Vec<RoleAssignment>,
    pub(crate) staff: HashSet<(TenantId, StaffId)>,
    pub(crate) departments: Vec<Department>,
    pub(crate) teams: Vec<Team>,
}

/// Single-lock store standing in for every repository port.
#[derive(Default)]
pub(crate) struct FakeRbacStore {
    pub(crate) state: Mutex<FakeState>,
}

impl FakeRbacStore {
    pub(crate) async fn add_staff(&self, tenant_id: TenantId, staff_id: StaffId) {
        self.state.lock().await.staff.insert((tenant_id, staff_id));
    }

    pub(crate) async fn add_role(&self, role: Role) -> Role {
        self.state.lock().await.roles.push(role.clone());
        role
    }

    pub(crate) async fn grant(
        &self,
        tenant_id: TenantId,
        staff_id: StaffId,
        role: &Role,
    ) -> RoleAssignment {
        let assignment = NewAssignment {
            staff_id,
            role_id: role.role_id,
            scope: None,
            expires_at: None,
            is_primary: false,
            assigned_by: None,
            notes: None,
        }
        .into_assignment(tenant_id, None, Utc::now());
        let mut state = self.state.lock().await;
        state.staff.insert((tenant_id, staff_id));
        state.assignments.push(assignment.clone());
        assignment
    }

    pub(crate) async fn active_assignment_count(&self, staff_id: StaffId) -> usize {
        let now = Utc::now();
        self.state
            .lock()
            .await
            .assignments
            .iter()
            .filter(|assignment| assignment.staff_id == staff_id && assignment.is_effective_at(now))
            .count()
    }
}

fn find_visible_role(
    state: &FakeState,
    tenant_id: TenantId,
    vendor_id: Option<VendorId>,
    role_id: RoleId,
) -> AppResult<usize> {
    state
        .roles
        .iter()
        .position(|role| {
            role.role_id == role_id
                && role.tenant_id == tenant_id
                && vendor_visible(role.vendor_id, vendor_id)
        })
        .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))
}

#[async_trait]
impl RoleRepository for FakeRbacStore {
    async fn find_role(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        role_id: RoleId,
    ) -> AppResult<Option<Role>> {
        let state = self.state.lock().await;
        Ok(find_visible_role(&state, tenant_id, vendor_id, role_id)
            .ok()
            .map(|index| state.roles[index].clone()))
    }

    async fn find_role_by_name(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        name: &RoleSlug,
    ) -> AppResult<Option<Role>> {
        let state = self.state.lock().await;
        Ok(state
            .roles
            .iter()
            .filter(|role| {
                role.tenant_id == tenant_id
                    && &role.name == name
                    && vendor_visible(role.vendor_id, vendor_id)
            })
            .max_by_key(|role| role.vendor_id.is_some())
            .cloned())
    }

    async fn list_roles(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
    ) -> AppResult<Vec<Role>> {
        let state = self.state.lock().await;
        let mut roles: Vec<Role> = state
            .roles
            .iter()
            .filter(|role| role.tenant_id == tenant_id && vendor_visible(role.vendor_id, vendor_id))
            .cloned()
            .collect();
        roles.sort_by(|left, right| right.priority.cmp(&left.priority));
        Ok(roles)
    }

    async fn create_role(&self, role: Role) -> AppResult<Role> {
        let mut state = self.state.lock().await;
        if state.roles.iter().any(|existing| {
            existing.tenant_id == role.tenant_id
                && existing.vendor_id == role.vendor_id
                && existing.name == role.name
        }) {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists",
                role.name.as_str()
            )));
        }
        state.roles.push(role.clone());
        Ok(role)
    }

    async fn update_role(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        role_id: RoleId,
        update: RoleUpdate,
        guard: &RoleGuard<'_>,
    ) -> AppResult<RoleChange> {
        let mut state = self.state.lock().await;
        let index = find_visible_role(&state, tenant_id, vendor_id, role_id)?;
        let before = state.roles[index].clone();
        guard(&before)?;
        let after = before.apply_update(update)?;
        state.roles[index] = after.clone();
        Ok(RoleChange { before, after })
    }

    async fn replace_role_permissions(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        role_id: RoleId,
        permissions: BTreeSet<Permission>,
        _granted_by: Option<StaffId>,
        guard: &RoleGuard<'_>,
    ) -> AppResult<RoleChange> {
        let mut state = self.state.lock().await;
        let index = find_visible_role(&state, tenant_id, vendor_id, role_id)?;
        let before = state.roles[index].clone();
        guard(&before)?;
        let mut after = before.clone();
        after.permissions = permissions;
        state.roles[index] = after.clone();
        Ok(RoleChange { before, after })
    }

    async fn delete_role(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        role_id: RoleId,
        guard: &RoleGuard<'_>,
    ) -> AppResult<RoleDeletion> {
        let mut state = self.state.lock().await;
        let index = find_visible_role(&state, tenant_id, vendor_id, role_id)?;
        let role = state.roles[index].clone();
        guard(&role)?;
        let referenced = state
            .assignments
            .iter()
            .any(|assignment| assignment.role_id == role_id && assignment.is_active);
        if referenced {
            state.roles[index].is_active = false;
            Ok(RoleDeletion::Deactivated(role))
        } else {
            state.roles.remove(index);
            Ok(RoleDeletion::Deleted(role))
        }
    }
}

#[async_trait]
impl AssignmentLedger for FakeRbacStore {
    async fn list_active_grants(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        staff_id: StaffId,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<RoleGrant>> {
        let state = self.state.lock().await;
        Ok(state
            .assignments
            .iter()
            .filter(|assignment| {
                assignment.tenant_id == tenant_id
                    && assignment.staff_id == staff_id
                    && vendor_visible(assignment.vendor_id, vendor_id)
                    && assignment.is_effective_at(now)
            })
            .filter_map(|assignment| {
                state
                    .roles
                    .iter()
                    .find(|role| role.role_id == assignment.role_id)
                    .map(|role| RoleGrant {
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
        let state = self.state.lock().await;
        let mut assignments: Vec<RoleAssignment> = state
            .assignments
            .iter()
            .filter(|assignment| {
                assignment.tenant_id == tenant_id
                    && assignment.staff_id == staff_id
                    && vendor_visible(assignment.vendor_id, vendor_id)
                    && assignment.is_effective_at(now)
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
        let mut state = self.state.lock().await;
        let index = find_visible_role(&state, tenant_id, vendor_id, assignment.role_id)?;
        let role = state.roles[index].clone();
        if !role.is_active {
            return Err(AppError::Validation(format!(
                "role '{}' is inactive",
                role.name.as_str()
            )));
        }
        let already_assigned = state.assignments.iter().any(|existing| {
            existing.tenant_id == tenant_id
                && existing.staff_id == assignment.staff_id
                && existing.role_id == assignment.role_id
                && existing.is_effective_at(now)
        });
        guard(LockedAssignment {
            role: &role,
            already_assigned,
        })?;
        if assignment.is_primary {
            for existing in state
                .assignments
                .iter_mut()
                .filter(|existing| existing.staff_id == assignment.staff_id)
            {
                existing.is_primary = false;
            }
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
        let mut state = self.state.lock().await;
        let role_index = find_visible_role(&state, tenant_id, vendor_id, role_id)?;
        let role = state.roles[role_index].clone();
        let visible = |assignment: &RoleAssignment| {
            assignment.tenant_id == tenant_id
                && assignment.staff_id == staff_id
                && vendor_visible(assignment.vendor_id, vendor_id)
                && assignment.is_effective_at(now)
        };
        let position = state
            .assignments
            .iter()
            .position(|assignment| visible(assignment) && assignment.role_id == role_id)
            .ok_or_else(|| AppError::NotFound("role assignment was not found".to_owned()))?;
        let remaining = state.assignments.iter().filter(|assignment| visible(assignment)).count();
        if is_self_removal && remaining <= 1 {
            return Err(DenialReason::LastRoleRemoval.into());
        }
        guard(LockedAssignment {
            role: &role,
            already_assigned: true,
        })?;
        state.assignments[position].is_active = false;
        state.assignments[position].is_primary = false;
        Ok(state.assignments[position].clone())
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
        let mut state = self.state.lock().await;
        let role_index = find_visible_role(&state, tenant_id, vendor_id, role_id)?;
        let role = state.roles[role_index].clone();
        let position = state
            .assignments
            .iter()
            .position(|assignment| {
                assignment.tenant_id == tenant_id
                    && assignment.staff_id == staff_id
                    && assignment.role_id == role_id
                    && assignment.is_effective_at(now)
            })
            .ok_or_else(|| AppError::NotFound("role assignment was not found".to_owned()))?;
        guard(LockedAssignment {
            role: &role,
            already_assigned: true,
        })?;
        let previous_role_id = state
            .assignments
            .iter()
            .find(|assignment| assignment.staff_id == staff_id && assignment.is_primary)
            .map(|assignment| assignment.role_id);
        for assignment in state
            .assignments
            .iter_mut()
            .filter(|assignment| assignment.staff_id == staff_id)
        {
            assignment.is_primary = false;
        }
        state.assignments[position].is_primary = true;
        Ok(PrimaryRoleChange {
            previous_role_id,
            assignment: state.assignments[position].clone(),
        })
    }

    async fn deactivate_expired(&self, now: DateTime<Utc>) -> AppResult<Vec<RoleAssignment>> {
        let mut state = self.state.lock().await;
        let mut expired = Vec::new();
        for assignment in state.assignments.iter_mut() {
            if assignment.is_active && assignment.expires_at.is_some_and(|at| at <= now) {
                assignment.is_active = false;
                expired.push(assignment.clone());
            }
        }
        Ok(expired)
    }
}

#[async_trait]
impl StaffDirectory for FakeRbacStore {
    async fn staff_exists(&self, tenant_id: TenantId, staff_id: StaffId) -> AppResult<bool> {
        Ok(self.state.lock().await.staff.contains(&(tenant_id, staff_id)))
    }
}

#[async_trait]
impl DepartmentRepository for FakeRbacStore {
    async fn list_departments(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
    ) -> AppResult<Vec<Department>> {
        let state = self.state.lock().await;
        Ok(state
            .departments
            .iter()
            .filter(|department| {
                department.tenant_id == tenant_id
                    && department.is_active
                    && vendor_visible(department.vendor_id, vendor_id)
            })
            .cloned()
            .collect())
    }

    async fn find_department(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        department_id: DepartmentId,
    ) -> AppResult<Option<Department>> {
        Ok(self
            .list_departments(tenant_id, vendor_id)
            .await?
            .into_iter()
            .find(|department| department.department_id == department_id))
    }

    async fn department_forest(&self, tenant_id: TenantId) -> AppResult<DepartmentForest> {
        let state = self.state.lock().await;
        Ok(DepartmentForest::from_links(
            state
                .departments
                .iter()
                .filter(|department| department.tenant_id == tenant_id && department.is_active)
                .map(|department| (department.department_id, department.parent_department_id)),
        ))
    }

    async fn create_department(&self, department: Department) -> AppResult<Department> {
        self.state.lock().await.departments.push(department.clone());
        Ok(department)
    }

    async fn update_department(
        &self,
        tenant_id: TenantId,
        _vendor_id: Option<VendorId>,
        department_id: DepartmentId,
        update: DepartmentUpdate,
    ) -> AppResult<DepartmentChange> {
        let mut state = self.state.lock().await;
        let forest = DepartmentForest::from_links(
            state
                .departments
                .iter()
                .filter(|department| department.tenant_id == tenant_id && department.is_active)
                .map(|department| (department.department_id, department.parent_department_id)),
        );
        let index = state
            .departments
            .iter()
            .position(|department| {
                department.department_id == department_id && department.tenant_id == tenant_id
            })
            .ok_or_else(|| AppError::NotFound("department was not found".to_owned()))?;
        if let Some(Some(parent)) = update.parent_department_id
            && forest.would_create_cycle(department_id, parent)
        {
            return Err(AppError::CycleDetected("department cycle".to_owned()));
        }
        let before = state.departments[index].clone();
        let after = before.with_update(update);
        state.departments[index] = after.clone();
        Ok(DepartmentChange { before, after })
    }

    async fn delete_department(
        &self,
        tenant_id: TenantId,
        _vendor_id: Option<VendorId>,
        department_id: DepartmentId,
    ) -> AppResult<Department> {
        let mut state = self.state.lock().await;
        let team_count = state
            .teams
            .iter()
            .filter(|team| team.department_id == department_id && team.is_active)
            .count() as u64;
        if team_count > 0 {
            return Err(AppError::HasDependentTeams {
                department_id: department_id.to_string(),
                team_count,
            });
        }
        let department = state
            .departments
            .iter_mut()
            .find(|department| {
                department.department_id == department_id && department.tenant_id == tenant_id
            })
            .ok_or_else(|| AppError::NotFound("department was not found".to_owned()))?;
        department.is_active = false;
        Ok(department.clone())
    }

    async fn list_teams(
        &self,
        tenant_id: TenantId,
        _vendor_id: Option<VendorId>,
        department_id: Option<DepartmentId>,
    ) -> AppResult<Vec<Team>> {
        let state = self.state.lock().await;
        Ok(state
            .teams
            .iter()
            .filter(|team| {
                team.tenant_id == tenant_id
                    && team.is_active
                    && department_id.is_none_or(|department_id| team.department_id == department_id)
            })
            .cloned()
            .collect())
    }

    async fn create_team(&self, team: Team) -> AppResult<Team> {
        self.state.lock().await.teams.push(team.clone());
        Ok(team)
    }

    async fn update_team(
        &self,
        _tenant_id: TenantId,
        _vendor_id: Option<VendorId>,
        team_id: TeamId,
        update: TeamUpdate,
    ) -> AppResult<TeamChange> {
        let mut state = self.state.lock().await;
        let team = state
            .teams
            .iter_mut()
            .find(|team| team.team_id == team_id)
            .ok_or_else(|| AppError::NotFound("team was not found".to_owned()))?;
        let before = team.clone();
        *team = before.with_update(update);
        Ok(TeamChange {
            before,
            after: team.clone(),
        })
    }

    async fn delete_team(
        &self,
        _tenant_id: TenantId,
        _vendor_id: Option<VendorId>,
        team_id: TeamId,
    ) -> AppResult<Team> {
        let mut state = self.state.lock().await;
        let team = state
            .teams
            .iter_mut()
            .find(|team| team.team_id == team_id)
            .ok_or_else(|| AppError::NotFound("team was not found".to_owned()))?;
        team.is_active = false;
        Ok(team.clone())
    }
}

/// Behaviour of the fake cache backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum CacheMode {
    #[default]
    Healthy,
    Failing,
    Stalled,
}

#[derive(Default)]
pub(crate) struct FakePermissionCache {
    pub(crate) mode: Mutex<CacheMode>,
    pub(crate) entries: Mutex<HashMap<StaffScope, EffectivePermissions>>,
    pub(crate) epochs: Mutex<HashMap<TenantId, u64>>,
    pub(crate) staff_invalidations: Mutex<Vec<(TenantId, Option<VendorId>, StaffId)>>,
    pub(crate) tenant_invalidations: Mutex<Vec<TenantId>>,
}

impl FakePermissionCache {
    async fn check_backend(&self) -> AppResult<()> {
        let mode = *self.mode.lock().await;
        match mode {
            CacheMode::Healthy => Ok(()),
            CacheMode::Failing => Err(AppError::Internal("cache backend offline".to_owned())),
            CacheMode::Stalled => {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            }
        }
    }

    async fn bump(&self, tenant_id: TenantId) {
        *self.epochs.lock().await.entry(tenant_id).or_default() += 1;
    }
}

#[async_trait]
impl PermissionCache for FakePermissionCache {
    async fn get(&self, scope: StaffScope) -> AppResult<Option<EffectivePermissions>> {
        self.check_backend().await?;
        Ok(self.entries.lock().await.get(&scope).cloned())
    }

    async fn epoch(&self, tenant_id: TenantId) -> AppResult<u64> {
        self.check_backend().await?;
        Ok(self.epochs.lock().await.get(&tenant_id).copied().unwrap_or_default())
    }

    async fn store_if_current(
        &self,
        snapshot: &EffectivePermissions,
        observed_epoch: u64,
        _ttl_seconds: u32,
    ) -> AppResult<bool> {
        self.check_backend().await?;
        let epochs = self.epochs.lock().await;
        if epochs.get(&snapshot.tenant_id).copied().unwrap_or_default() != observed_epoch {
            return Ok(false);
        }
        self.entries
            .lock()
            .await
            .insert(snapshot.scope(), snapshot.clone());
        Ok(true)
    }

    async fn invalidate_staff(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        staff_id: StaffId,
    ) -> AppResult<()> {
        self.staff_invalidations
            .lock()
            .await
            .push((tenant_id, vendor_id, staff_id));
        self.check_backend().await?;
        self.bump(tenant_id).await;
        self.entries.lock().await.retain(|scope, _| {
            !(scope.tenant_id == tenant_id
                && scope.staff_id == staff_id
                && (vendor_id.is_none() || scope.vendor_id == vendor_id))
        });
        Ok(())
    }

    async fn invalidate_tenant(&self, tenant_id: TenantId) -> AppResult<()> {
        self.tenant_invalidations.lock().await.push(tenant_id);
        self.check_backend().await?;
        self.bump(tenant_id).await;
        self.entries
            .lock()
            .await
            .retain(|scope, _| scope.tenant_id != tenant_id);
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeAuditRepository {
    pub(crate) events: Mutex<Vec<AuditEvent>>,
}

#[async_trait]
impl AuditRepository for FakeAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        self.events.lock().await.push(event);
        Ok(())
    }
}

pub(crate) struct FakeAuditLogRepository;

#[async_trait]
impl AuditLogRepository for FakeAuditLogRepository {
    async fn list_recent_entries(
        &self,
        _tenant_id: TenantId,
        _query: AuditLogQuery,
    ) -> AppResult<Vec<AuditLogEntry>> {
        Ok(Vec::new())
    }
}

/// Wired fakes plus the services under test.
pub(crate) struct Harness {
    pub(crate) tenant_id: TenantId,
    pub(crate) store: Arc<FakeRbacStore>,
    pub(crate) cache: Arc<FakePermissionCache>,
    pub(crate) audit: Arc<FakeAuditRepository>,
    pub(crate) dispatcher: AuditDispatcher,
    pub(crate) drain: AuditDrain,
    pub(crate) permissions: EffectivePermissionService,
}

impl Harness {
    pub(crate) fn new() -> Self {
        let store = Arc::new(FakeRbacStore::default());
        let cache = Arc::new(FakePermissionCache::default());
        let audit = Arc::new(FakeAuditRepository::default());
        let (dispatcher, drain) =
            AuditDispatcher::spawn(audit.clone(), AuditDispatcherSettings::default());
        let permissions = EffectivePermissionService::new(
            store.clone(),
            cache.clone(),
            PermissionCacheSettings::default(),
        );

        Self {
            tenant_id: TenantId::new(),
            store,
            cache,
            audit,
            dispatcher,
            drain,
            permissions,
        }
    }

    /// Creates a role in the harness tenant.
    pub(crate) async fn role(
        &self,
        name: &str,
        priority: i32,
        capabilities: RoleCapabilities,
        permissions: &[Permission],
    ) -> Role {
        self.store
            .add_role(Role::from_draft(
                self.tenant_id,
                None,
                draft(name, priority, capabilities, permissions),
                false,
            ))
            .await
    }

    /// Creates a staff member holding the given roles and returns their principal.
    pub(crate) async fn principal_with(&self, roles: &[&Role]) -> StaffPrincipal {
        let staff_id = StaffId::new();
        self.store.add_staff(self.tenant_id, staff_id).await;
        for role in roles {
            self.store.grant(self.tenant_id, staff_id, role).await;
        }
        StaffPrincipal::new(staff_id, staff_id.to_string(), "Staff", self.tenant_id, None)
    }

    /// Stops the audit queue and returns every persisted event.
    pub(crate) async fn audit_events(self) -> Vec<AuditEvent> {
        let Self {
            dispatcher,
            drain,
            audit,
            ..
        } = self;
        drop(dispatcher);
        drain.finish().await;
        audit.events.lock().await.clone()
    }
}

pub(crate) fn draft(
    name: &str,
    priority: i32,
    capabilities: RoleCapabilities,
    permissions: &[Permission],
) -> RoleDraft {
    RoleDraft {
        name: RoleSlug::new(name).unwrap_or_else(|_| unreachable!()),
        display_name: NonEmptyString::new(name).unwrap_or_else(|_| unreachable!()),
        description: None,
        priority: PriorityLevel::new(priority).unwrap_or(PriorityLevel::NONE),
        capabilities,
        max_assignable_priority: None,
        permissions: permissions.iter().copied().collect(),
    }
}
