use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, Transaction};

use staffguard_application::StaffDirectory;
use staffguard_core::{AppError, AppResult, NonEmptyString, StaffId, TenantId, VendorId};
use staffguard_domain::{Permission, PriorityLevel, Role, RoleCapabilities, RoleId, RoleSlug};

mod assignments;
mod organization;
mod roles;


/// PostgreSQL-backed repository for roles, assignments and the
/// department tree.
#[derive(Clone)]
pub struct PostgresRbacRepository {
    pool: PgPool,
}

impl PostgresRbacRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> AppResult<Transaction<'_, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|error| AppError::Internal(format!("failed to begin transaction: {error}")))
    }

    async fn acquire(&self) -> AppResult<PoolConnection<Postgres>> {
        self.pool.acquire().await.map_err(|error| {
            AppError::Internal(format!("failed to acquire database connection: {error}"))
        })
    }
}

async fn commit(transaction: Transaction<'_, Postgres>) -> AppResult<()> {
    transaction
        .commit()
        .await
        .map_err(|error| AppError::Internal(format!("failed to commit transaction: {error}")))
}

#[derive(Debug, FromRow)]
struct RoleRow {
    role_id: uuid::Uuid,
    tenant_id: uuid::Uuid,
    vendor_id: Option<uuid::Uuid>,
    name: String,
    display_name: String,
    description: Option<String>,
    priority_level: i32,
    can_manage_staff: bool,
    can_create_roles: bool,
    can_delete_roles: bool,
    max_assignable_priority: Option<i32>,
    is_system: bool,
    is_active: bool,
    permission: Option<String>,
}

impl RoleRow {
    fn to_role(&self) -> AppResult<Role> {
        let stored = |error: AppError| {
            AppError::Internal(format!("invalid stored role '{}': {error}", self.role_id))
        };

        Ok(Role {
            role_id: RoleId::from_uuid(self.role_id),
            tenant_id: TenantId::from_uuid(self.tenant_id),
            vendor_id: self.vendor_id.map(VendorId::from_uuid),
            name: RoleSlug::new(self.name.as_str()).map_err(stored)?,
            display_name: NonEmptyString::new(self.display_name.as_str()).map_err(stored)?,
            description: self.description.clone(),
            priority: PriorityLevel::new(self.priority_level).map_err(stored)?,
            capabilities: RoleCapabilities {
                can_manage_staff: self.can_manage_staff,
                can_create_roles: self.can_create_roles,
                can_delete_roles: self.can_delete_roles,
            },
            max_assignable_priority: self
                .max_assignable_priority
                .map(PriorityLevel::new)
                .transpose()
                .map_err(stored)?,
            is_system: self.is_system,
            is_active: self.is_active,
            permissions: Default::default(),
        })
    }
}

/// Folds one-row-per-grant results into roles, keeping row order.
fn aggregate_roles(rows: Vec<RoleRow>) -> AppResult<Vec<Role>> {
    let mut roles: Vec<Role> = Vec::new();
    let mut positions: HashMap<uuid::Uuid, usize> = HashMap::new();

    for row in rows {
        let index = match positions.get(&row.role_id) {
            Some(index) => *index,
            None => {
                positions.insert(row.role_id, roles.len());
                roles.push(row.to_role()?);
                roles.len() - 1
            }
        };

        if let Some(permission_value) = row.permission.as_deref() {
            let permission = Permission::from_str(permission_value).map_err(|error| {
                AppError::Internal(format!(
                    "invalid stored permission '{permission_value}' for role '{}': {error}",
                    row.role_id
                ))
            })?;
            roles[index].permissions.insert(permission);
        }
    }

    Ok(roles)
}

/// Filters applied by [`fetch_roles`]; unset fields match everything.
#[derive(Debug, Default)]
struct RoleFilter<'a> {
    role_ids: Option<Vec<uuid::Uuid>>,
    name: Option<&'a str>,
}

/// Loads roles visible from the scope, highest priority first.
async fn fetch_roles(
    connection: &mut PgConnection,
    tenant_id: TenantId,
    vendor_id: Option<VendorId>,
    filter: RoleFilter<'_>,
) -> AppResult<Vec<Role>> {
    let rows = sqlx::query_as::<_, RoleRow>(
        r#"
        SELECT
            roles.id AS role_id,
            roles.tenant_id,
            roles.vendor_id,
            roles.name,
            roles.display_name,
            roles.description,
            roles.priority_level,
            roles.can_manage_staff,
            roles.can_create_roles,
            roles.can_delete_roles,
            roles.max_assignable_priority,
            roles.is_system,
            roles.is_active,
            grants.permission
        FROM rbac_roles AS roles
        LEFT JOIN rbac_role_permissions AS grants
            ON grants.role_id = roles.id
        WHERE roles.tenant_id = $1
            AND (roles.vendor_id IS NULL OR roles.vendor_id = $2)
            AND ($3::UUID[] IS NULL OR roles.id = ANY($3))
            AND ($4::TEXT IS NULL OR roles.name = $4)
        ORDER BY roles.priority_level DESC, roles.name, grants.permission
        "#,
    )
    .bind(tenant_id.as_uuid())
    .bind(vendor_id.map(|vendor_id| vendor_id.as_uuid()))
    .bind(filter.role_ids)
    .bind(filter.name)
    .fetch_all(&mut *connection)
    .await
    .map_err(|error| AppError::Internal(format!("failed to load roles: {error}")))?;

    aggregate_roles(rows)
}

/// Locks and loads one visible role inside a transaction.
async fn lock_role(
    connection: &mut PgConnection,
    tenant_id: TenantId,
    vendor_id: Option<VendorId>,
    role_id: RoleId,
) -> AppResult<Role> {
    let locked = sqlx::query_scalar::<_, uuid::Uuid>(
        r#"
        SELECT id
        FROM rbac_roles
        WHERE id = $1
            AND tenant_id = $2
            AND (vendor_id IS NULL OR vendor_id = $3)
        FOR UPDATE
        "#,
    )
    .bind(role_id.as_uuid())
    .bind(tenant_id.as_uuid())
    .bind(vendor_id.map(|vendor_id| vendor_id.as_uuid()))
    .fetch_optional(&mut *connection)
    .await
    .map_err(|error| AppError::Internal(format!("failed to lock role: {error}")))?;

    if locked.is_none() {
        return Err(AppError::NotFound(format!("role '{role_id}' does not exist")));
    }

    fetch_roles(
        connection,
        tenant_id,
        vendor_id,
        RoleFilter {
            role_ids: Some(vec![role_id.as_uuid()]),
            ..RoleFilter::default()
        },
    )
    .await?
    .into_iter()
    .next()
    .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' does not exist")))
}

/// Serializes assignment mutations for one staff member until commit.
async fn lock_staff_assignments(
    connection: &mut PgConnection,
    tenant_id: TenantId,
    staff_id: StaffId,
) -> AppResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(format!("rbac-assignments:{tenant_id}:{staff_id}"))
        .execute(&mut *connection)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to lock staff assignments: {error}"))
        })?;

    Ok(())
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(
        error,
        sqlx::Error::Database(database_error) if database_error.code().as_deref() == Some("23505")
    )
}

#[async_trait]
impl StaffDirectory for PostgresRbacRepository {
    async fn staff_exists(&self, tenant_id: TenantId, staff_id: StaffId) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM staff_members
                WHERE tenant_id = $1
                    AND id = $2
                    AND is_active
            )
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(staff_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to resolve staff member: {error}")))
    }
}
