use async_trait::async_trait;
use sqlx::{FromRow, PgConnection};

use staffguard_application::{DepartmentChange, DepartmentRepository, TeamChange};
use staffguard_core::{AppError, AppResult, NonEmptyString, StaffId, TenantId, VendorId};
use staffguard_domain::{
    Department, DepartmentForest, DepartmentId, DepartmentUpdate, RoleId, Team, TeamId,
    TeamUpdate,
};

use super::{PostgresRbacRepository, commit};

#[derive(Debug, FromRow)]
struct DepartmentRow {
    id: uuid::Uuid,
    tenant_id: uuid::Uuid,
    vendor_id: Option<uuid::Uuid>,
    name: String,
    code: Option<String>,
    description: Option<String>,
    parent_department_id: Option<uuid::Uuid>,
    head_staff_id: Option<uuid::Uuid>,
    is_active: bool,
}

impl TryFrom<DepartmentRow> for Department {
    type Error = AppError;

    fn try_from(row: DepartmentRow) -> Result<Self, Self::Error> {
        let name = NonEmptyString::new(row.name).map_err(|error| {
            AppError::Internal(format!("invalid stored department '{}': {error}", row.id))
        })?;

        Ok(Self {
            department_id: DepartmentId::from_uuid(row.id),
            tenant_id: TenantId::from_uuid(row.tenant_id),
            vendor_id: row.vendor_id.map(VendorId::from_uuid),
            name,
            code: row.code,
            description: row.description,
            parent_department_id: row.parent_department_id.map(DepartmentId::from_uuid),
            head_staff_id: row.head_staff_id.map(StaffId::from_uuid),
            is_active: row.is_active,
        })
    }
}

#[derive(Debug, FromRow)]
struct TeamRow {
    id: uuid::Uuid,
    tenant_id: uuid::Uuid,
    vendor_id: Option<uuid::Uuid>,
    department_id: uuid::Uuid,
    name: String,
    code: Option<String>,
    description: Option<String>,
    team_lead_id: Option<uuid::Uuid>,
    default_role_id: Option<uuid::Uuid>,
    max_capacity: Option<i32>,
    is_active: bool,
}

impl TryFrom<TeamRow> for Team {
    type Error = AppError;

    fn try_from(row: TeamRow) -> Result<Self, Self::Error> {
        let name = NonEmptyString::new(row.name).map_err(|error| {
            AppError::Internal(format!("invalid stored team '{}': {error}", row.id))
        })?;
        let max_capacity = row
            .max_capacity
            .map(u32::try_from)
            .transpose()
            .map_err(|error| {
                AppError::Internal(format!("invalid stored team capacity '{}': {error}", row.id))
            })?;

        Ok(Self {
            team_id: TeamId::from_uuid(row.id),
            tenant_id: TenantId::from_uuid(row.tenant_id),
            vendor_id: row.vendor_id.map(VendorId::from_uuid),
            department_id: DepartmentId::from_uuid(row.department_id),
            name,
            code: row.code,
            description: row.description,
            team_lead_id: row.team_lead_id.map(StaffId::from_uuid),
            default_role_id: row.default_role_id.map(RoleId::from_uuid),
            max_capacity,
            is_active: row.is_active,
        })
    }
}

fn capacity_column(max_capacity: Option<u32>) -> AppResult<Option<i32>> {
    max_capacity
        .map(i32::try_from)
        .transpose()
        .map_err(|error| AppError::Validation(format!("team capacity is too large: {error}")))
}

/// Loads one active department visible from the scope, optionally locking it.
async fn fetch_department(
    connection: &mut PgConnection,
    tenant_id: TenantId,
    vendor_id: Option<VendorId>,
    department_id: DepartmentId,
    lock: Option<&str>,
) -> AppResult<Option<Department>> {
    let query = format!(
        r#"
        SELECT
            id,
            tenant_id,
            vendor_id,
            name,
            code,
            description,
            parent_department_id,
            head_staff_id,
            is_active
        FROM departments
        WHERE id = $1
            AND tenant_id = $2
            AND (vendor_id IS NULL OR vendor_id = $3)
            AND is_active
        {}
        "#,
        lock.unwrap_or_default()
    );

    sqlx::query_as::<_, DepartmentRow>(query.as_str())
        .bind(department_id.as_uuid())
        .bind(tenant_id.as_uuid())
        .bind(vendor_id.map(|vendor_id| vendor_id.as_uuid()))
        .fetch_optional(&mut *connection)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load department: {error}")))?
        .map(Department::try_from)
        .transpose()
}

async fn require_department(
    connection: &mut PgConnection,
    tenant_id: TenantId,
    vendor_id: Option<VendorId>,
    department_id: DepartmentId,
    lock: &str,
) -> AppResult<Department> {
    fetch_department(connection, tenant_id, vendor_id, department_id, Some(lock))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("department '{department_id}' does not exist")))
}

async fn require_parent(
    connection: &mut PgConnection,
    tenant_id: TenantId,
    vendor_id: Option<VendorId>,
    parent_id: DepartmentId,
) -> AppResult<()> {
    let parent =
        fetch_department(connection, tenant_id, vendor_id, parent_id, Some("FOR SHARE")).await?;
    if parent.is_none() {
        return Err(AppError::Validation(format!(
            "department '{parent_id}' does not exist"
        )));
    }

    Ok(())
}

async fn fetch_forest(
    connection: &mut PgConnection,
    tenant_id: TenantId,
) -> AppResult<DepartmentForest> {
    let links = sqlx::query_as::<_, (uuid::Uuid, Option<uuid::Uuid>)>(
        r#"
        SELECT id, parent_department_id
        FROM departments
        WHERE tenant_id = $1
            AND is_active
        "#,
    )
    .bind(tenant_id.as_uuid())
    .fetch_all(&mut *connection)
    .await
    .map_err(|error| AppError::Internal(format!("failed to load department tree: {error}")))?;

    Ok(DepartmentForest::from_links(links.into_iter().map(
        |(department_id, parent_id)| {
            (
                DepartmentId::from_uuid(department_id),
                parent_id.map(DepartmentId::from_uuid),
            )
        },
    )))
}

async fn count_teams(
    connection: &mut PgConnection,
    tenant_id: TenantId,
    department_id: DepartmentId,
) -> AppResult<u64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM teams
        WHERE tenant_id = $1
            AND department_id = $2
            AND is_active
        "#,
    )
    .bind(tenant_id.as_uuid())
    .bind(department_id.as_uuid())
    .fetch_one(&mut *connection)
    .await
    .map_err(|error| AppError::Internal(format!("failed to count teams: {error}")))?;

    Ok(u64::try_from(count).unwrap_or_default())
}

async fn fetch_team_for_update(
    connection: &mut PgConnection,
    tenant_id: TenantId,
    vendor_id: Option<VendorId>,
    team_id: TeamId,
) -> AppResult<Team> {
    sqlx::query_as::<_, TeamRow>(
        r#"
        SELECT
            id,
            tenant_id,
            vendor_id,
            department_id,
            name,
            code,
            description,
            team_lead_id,
            default_role_id,
            max_capacity,
            is_active
        FROM teams
        WHERE id = $1
            AND tenant_id = $2
            AND (vendor_id IS NULL OR vendor_id = $3)
            AND is_active
        FOR UPDATE
        "#,
    )
    .bind(team_id.as_uuid())
    .bind(tenant_id.as_uuid())
    .bind(vendor_id.map(|vendor_id| vendor_id.as_uuid()))
    .fetch_optional(&mut *connection)
    .await
    .map_err(|error| AppError::Internal(format!("failed to load team: {error}")))?
    .map(Team::try_from)
    .transpose()?
    .ok_or_else(|| AppError::NotFound(format!("team '{team_id}' does not exist")))
}

/// Serializes reparenting within one tenant so concurrent moves cannot
/// jointly close a loop.
async fn lock_department_tree(connection: &mut PgConnection, tenant_id: TenantId) -> AppResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(format!("departments:{tenant_id}"))
        .execute(&mut *connection)
        .await
        .map_err(|error| AppError::Internal(format!("failed to lock department tree: {error}")))?;

    Ok(())
}

#[async_trait]
impl DepartmentRepository for PostgresRbacRepository {
    async fn list_departments(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
    ) -> AppResult<Vec<Department>> {
        let rows = sqlx::query_as::<_, DepartmentRow>(
            r#"
            SELECT
                id,
                tenant_id,
                vendor_id,
                name,
                code,
                description,
                parent_department_id,
                head_staff_id,
                is_active
            FROM departments
            WHERE tenant_id = $1
                AND (vendor_id IS NULL OR vendor_id = $2)
                AND is_active
            ORDER BY name
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(vendor_id.map(|vendor_id| vendor_id.as_uuid()))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list departments: {error}")))?;

        rows.into_iter().map(Department::try_from).collect()
    }

    async fn find_department(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        department_id: DepartmentId,
    ) -> AppResult<Option<Department>> {
        let mut connection = self.acquire().await?;
        fetch_department(&mut connection, tenant_id, vendor_id, department_id, None).await
    }

    async fn department_forest(&self, tenant_id: TenantId) -> AppResult<DepartmentForest> {
        let mut connection = self.acquire().await?;
        fetch_forest(&mut connection, tenant_id).await
    }

    async fn create_department(&self, department: Department) -> AppResult<Department> {
        let mut transaction = self.begin().await?;
        if let Some(parent_id) = department.parent_department_id {
            require_parent(
                &mut transaction,
                department.tenant_id,
                department.vendor_id,
                parent_id,
            )
            .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO departments (
                id,
                tenant_id,
                vendor_id,
                name,
                code,
                description,
                parent_department_id,
                head_staff_id,
                is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(department.department_id.as_uuid())
        .bind(department.tenant_id.as_uuid())
        .bind(department.vendor_id.map(|vendor_id| vendor_id.as_uuid()))
        .bind(department.name.as_str())
        .bind(department.code.as_deref())
        .bind(department.description.as_deref())
        .bind(department.parent_department_id.map(|parent_id| parent_id.as_uuid()))
        .bind(department.head_staff_id.map(|staff_id| staff_id.as_uuid()))
        .bind(department.is_active)
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to create department: {error}")))?;

        commit(transaction).await?;
        Ok(department)
    }

    async fn update_department(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        department_id: DepartmentId,
        update: DepartmentUpdate,
    ) -> AppResult<DepartmentChange> {
        let mut transaction = self.begin().await?;
        let reparenting = matches!(update.parent_department_id, Some(Some(_)));
        if reparenting {
            lock_department_tree(&mut transaction, tenant_id).await?;
        }

        let before = require_department(
            &mut transaction,
            tenant_id,
            vendor_id,
            department_id,
            "FOR UPDATE",
        )
        .await?;

        if let Some(Some(parent_id)) = update.parent_department_id {
            require_parent(&mut transaction, tenant_id, vendor_id, parent_id).await?;
            let forest = fetch_forest(&mut transaction, tenant_id).await?;
            if forest.would_create_cycle(department_id, parent_id) {
                return Err(AppError::CycleDetected(format!(
                    "department '{department_id}' cannot be placed under '{parent_id}'"
                )));
            }
        }

        let after = before.with_update(update);
        sqlx::query(
            r#"
            UPDATE departments
            SET name = $2,
                code = $3,
                description = $4,
                parent_department_id = $5,
                head_staff_id = $6,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(department_id.as_uuid())
        .bind(after.name.as_str())
        .bind(after.code.as_deref())
        .bind(after.description.as_deref())
        .bind(after.parent_department_id.map(|parent_id| parent_id.as_uuid()))
        .bind(after.head_staff_id.map(|staff_id| staff_id.as_uuid()))
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to update department: {error}")))?;

        commit(transaction).await?;
        Ok(DepartmentChange { before, after })
    }

    async fn delete_department(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        department_id: DepartmentId,
    ) -> AppResult<Department> {
        let mut transaction = self.begin().await?;
        let department = require_department(
            &mut transaction,
            tenant_id,
            vendor_id,
            department_id,
            "FOR UPDATE",
        )
        .await?;

        let team_count = count_teams(&mut transaction, tenant_id, department_id).await?;
        if team_count > 0 {
            return Err(AppError::HasDependentTeams {
                department_id: department_id.to_string(),
                team_count,
            });
        }

        sqlx::query("UPDATE departments SET is_active = FALSE, updated_at = now() WHERE id = $1")
            .bind(department_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to delete department: {error}"))
            })?;

        commit(transaction).await?;
        Ok(Department {
            is_active: false,
            ..department
        })
    }

    async fn list_teams(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        department_id: Option<DepartmentId>,
    ) -> AppResult<Vec<Team>> {
        let rows = sqlx::query_as::<_, TeamRow>(
            r#"
            SELECT
                id,
                tenant_id,
                vendor_id,
                department_id,
                name,
                code,
                description,
                team_lead_id,
                default_role_id,
                max_capacity,
                is_active
            FROM teams
            WHERE tenant_id = $1
                AND (vendor_id IS NULL OR vendor_id = $2)
                AND ($3::UUID IS NULL OR department_id = $3)
                AND is_active
            ORDER BY name
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(vendor_id.map(|vendor_id| vendor_id.as_uuid()))
        .bind(department_id.map(|department_id| department_id.as_uuid()))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list teams: {error}")))?;

        rows.into_iter().map(Team::try_from).collect()
    }

    async fn create_team(&self, team: Team) -> AppResult<Team> {
        let mut transaction = self.begin().await?;
        require_parent(
            &mut transaction,
            team.tenant_id,
            team.vendor_id,
            team.department_id,
        )
        .await?;

        sqlx::query(
            r#"
            INSERT INTO teams (
                id,
                tenant_id,
                vendor_id,
                department_id,
                name,
                code,
                description,
                team_lead_id,
                default_role_id,
                max_capacity,
                is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(team.team_id.as_uuid())
        .bind(team.tenant_id.as_uuid())
        .bind(team.vendor_id.map(|vendor_id| vendor_id.as_uuid()))
        .bind(team.department_id.as_uuid())
        .bind(team.name.as_str())
        .bind(team.code.as_deref())
        .bind(team.description.as_deref())
        .bind(team.team_lead_id.map(|staff_id| staff_id.as_uuid()))
        .bind(team.default_role_id.map(|role_id| role_id.as_uuid()))
        .bind(capacity_column(team.max_capacity)?)
        .bind(team.is_active)
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to create team: {error}")))?;

        commit(transaction).await?;
        Ok(team)
    }

    async fn update_team(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        team_id: TeamId,
        update: TeamUpdate,
    ) -> AppResult<TeamChange> {
        let mut transaction = self.begin().await?;
        let before = fetch_team_for_update(&mut transaction, tenant_id, vendor_id, team_id).await?;
        if let Some(department_id) = update.department_id {
            require_parent(&mut transaction, tenant_id, vendor_id, department_id).await?;
        }

        let after = before.with_update(update);
        sqlx::query(
            r#"
            UPDATE teams
            SET department_id = $2,
                name = $3,
                code = $4,
                description = $5,
                team_lead_id = $6,
                default_role_id = $7,
                max_capacity = $8,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(team_id.as_uuid())
        .bind(after.department_id.as_uuid())
        .bind(after.name.as_str())
        .bind(after.code.as_deref())
        .bind(after.description.as_deref())
        .bind(after.team_lead_id.map(|staff_id| staff_id.as_uuid()))
        .bind(after.default_role_id.map(|role_id| role_id.as_uuid()))
        .bind(capacity_column(after.max_capacity)?)
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to update team: {error}")))?;

        commit(transaction).await?;
        Ok(TeamChange { before, after })
    }

    async fn delete_team(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        team_id: TeamId,
    ) -> AppResult<Team> {
        let mut transaction = self.begin().await?;
        let team = fetch_team_for_update(&mut transaction, tenant_id, vendor_id, team_id).await?;

        sqlx::query("UPDATE teams SET is_active = FALSE, updated_at = now() WHERE id = $1")
            .bind(team_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| AppError::Internal(format!("failed to delete team: {error}")))?;

        commit(transaction).await?;
        Ok(Team {
            is_active: false,
            ..team
        })
    }
}
