use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};

use staffguard_application::{
    AssignmentGuard, AssignmentLedger, LockedAssignment, PrimaryRoleChange,
};
use staffguard_core::{
    AppError, AppResult, DenialReason, NonEmptyString, StaffId, TenantId, VendorId,
};
use staffguard_domain::{
    AssignmentId, AssignmentScope, NewAssignment, RoleAssignment, RoleGrant, RoleId,
};

use super::{
    PostgresRbacRepository, RoleFilter, commit, fetch_roles, is_unique_violation, lock_role,
    lock_staff_assignments,
};

#[derive(Debug, FromRow)]
struct AssignmentRow {
    id: uuid::Uuid,
    tenant_id: uuid::Uuid,
    vendor_id: Option<uuid::Uuid>,
    staff_id: uuid::Uuid,
    role_id: uuid::Uuid,
    scope_kind: Option<String>,
    scope_resource_id: Option<uuid::Uuid>,
    expires_at: Option<DateTime<Utc>>,
    is_primary: bool,
    is_active: bool,
    assigned_by: Option<uuid::Uuid>,
    assigned_at: DateTime<Utc>,
    notes: Option<String>,
}

impl TryFrom<AssignmentRow> for RoleAssignment {
    type Error = AppError;

    fn try_from(row: AssignmentRow) -> Result<Self, Self::Error> {
        let scope = row
            .scope_kind
            .map(|kind| {
                NonEmptyString::new(kind).map(|kind| AssignmentScope {
                    kind,
                    resource_id: row.scope_resource_id,
                })
            })
            .transpose()
            .map_err(|error| {
                AppError::Internal(format!("invalid stored assignment scope '{}': {error}", row.id))
            })?;

        Ok(Self {
            assignment_id: AssignmentId::from_uuid(row.id),
            tenant_id: TenantId::from_uuid(row.tenant_id),
            vendor_id: row.vendor_id.map(VendorId::from_uuid),
            staff_id: StaffId::from_uuid(row.staff_id),
            role_id: RoleId::from_uuid(row.role_id),
            scope,
            expires_at: row.expires_at,
            is_primary: row.is_primary,
            is_active: row.is_active,
            assigned_by: row.assigned_by.map(StaffId::from_uuid),
            assigned_at: row.assigned_at,
            notes: row.notes,
        })
    }
}

fn into_assignments(rows: Vec<AssignmentRow>) -> AppResult<Vec<RoleAssignment>> {
    rows.into_iter().map(RoleAssignment::try_from).collect()
}

/// Loads active, unexpired assignments visible from the scope.
async fn fetch_effective_assignments(
    connection: &mut PgConnection,
    tenant_id: TenantId,
    vendor_id: Option<VendorId>,
    staff_id: StaffId,
    now: DateTime<Utc>,
) -> AppResult<Vec<RoleAssignment>> {
    let rows = sqlx::query_as::<_, AssignmentRow>(
        r#"
        SELECT
            id,
            tenant_id,
            vendor_id,
            staff_id,
            role_id,
            scope_kind,
            scope_resource_id,
            expires_at,
            is_primary,
            is_active,
            assigned_by,
            assigned_at,
            notes
        FROM rbac_role_assignments
        WHERE tenant_id = $1
            AND staff_id = $2
            AND (vendor_id IS NULL OR vendor_id = $3)
            AND is_active
            AND (expires_at IS NULL OR expires_at > $4)
        ORDER BY is_primary DESC, assigned_at ASC
        "#,
    )
    .bind(tenant_id.as_uuid())
    .bind(staff_id.as_uuid())
    .bind(vendor_id.map(|vendor_id| vendor_id.as_uuid()))
    .bind(now)
    .fetch_all(&mut *connection)
    .await
    .map_err(|error| AppError::Internal(format!("failed to load role assignments: {error}")))?;

    into_assignments(rows)
}

fn require_held(
    assignments: &[RoleAssignment],
    staff_id: StaffId,
    role_id: RoleId,
) -> AppResult<RoleAssignment> {
    assignments
        .iter()
        .find(|assignment| assignment.role_id == role_id)
        .cloned()
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "staff member '{staff_id}' holds no active assignment for role '{role_id}'"
            ))
        })
}

/// Clears the primary flag on every assignment of the staff member and
/// returns the role that was primary among active rows.
async fn demote_primary(
    connection: &mut PgConnection,
    tenant_id: TenantId,
    staff_id: StaffId,
) -> AppResult<Option<RoleId>> {
    let demoted = sqlx::query_as::<_, (uuid::Uuid, bool)>(
        r#"
        UPDATE rbac_role_assignments
        SET is_primary = FALSE
        WHERE tenant_id = $1
            AND staff_id = $2
            AND is_primary
        RETURNING role_id, is_active
        "#,
    )
    .bind(tenant_id.as_uuid())
    .bind(staff_id.as_uuid())
    .fetch_all(&mut *connection)
    .await
    .map_err(|error| AppError::Internal(format!("failed to demote primary role: {error}")))?;

    Ok(demoted
        .into_iter()
        .find(|(_, is_active)| *is_active)
        .map(|(role_id, _)| RoleId::from_uuid(role_id)))
}

#[async_trait]
impl AssignmentLedger for PostgresRbacRepository {
    async fn list_active_grants(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        staff_id: StaffId,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<RoleGrant>> {
        let mut connection = self.acquire().await?;
        let assignments =
            fetch_effective_assignments(&mut connection, tenant_id, vendor_id, staff_id, now)
                .await?;
        if assignments.is_empty() {
            return Ok(Vec::new());
        }

        let role_ids: Vec<uuid::Uuid> = assignments
            .iter()
            .map(|assignment| assignment.role_id.as_uuid())
            .collect();
        let roles: HashMap<RoleId, _> = fetch_roles(
            &mut connection,
            tenant_id,
            vendor_id,
            RoleFilter {
                role_ids: Some(role_ids),
                ..RoleFilter::default()
            },
        )
        .await?
        .into_iter()
        .map(|role| (role.role_id, role))
        .collect();

        Ok(assignments
            .into_iter()
            .filter_map(|assignment| {
                roles.get(&assignment.role_id).map(|role| RoleGrant {
                    role: role.clone(),
                    assignment,
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
        let mut connection = self.acquire().await?;
        fetch_effective_assignments(&mut connection, tenant_id, vendor_id, staff_id, now).await
    }

    async fn assign(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        assignment: NewAssignment,
        guard: &AssignmentGuard<'_>,
    ) -> AppResult<RoleAssignment> {
        let now = Utc::now();
        let mut transaction = self.begin().await?;
        lock_staff_assignments(&mut transaction, tenant_id, assignment.staff_id).await?;

        let role = lock_role(&mut transaction, tenant_id, vendor_id, assignment.role_id).await?;
        if !role.is_active {
            return Err(AppError::Validation(format!(
                "role '{}' is inactive",
                role.name.as_str()
            )));
        }

        sqlx::query(
            r#"
            UPDATE rbac_role_assignments
            SET is_active = FALSE,
                is_primary = FALSE,
                deactivated_at = $4
            WHERE tenant_id = $1
                AND staff_id = $2
                AND role_id = $3
                AND is_active
                AND expires_at IS NOT NULL
                AND expires_at <= $4
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(assignment.staff_id.as_uuid())
        .bind(assignment.role_id.as_uuid())
        .bind(now)
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to retire lapsed assignment: {error}"))
        })?;

        let already_assigned = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM rbac_role_assignments
                WHERE tenant_id = $1
                    AND staff_id = $2
                    AND role_id = $3
                    AND is_active
            )
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(assignment.staff_id.as_uuid())
        .bind(assignment.role_id.as_uuid())
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to check assignment: {error}")))?;

        guard(LockedAssignment {
            role: &role,
            already_assigned,
        })?;
        if already_assigned {
            return Err(DenialReason::DuplicateAssignment.into());
        }

        if assignment.is_primary {
            demote_primary(&mut transaction, tenant_id, assignment.staff_id).await?;
        }

        let created = assignment.into_assignment(tenant_id, vendor_id, now);
        sqlx::query(
            r#"
            INSERT INTO rbac_role_assignments (
                id,
                tenant_id,
                vendor_id,
                staff_id,
                role_id,
                scope_kind,
                scope_resource_id,
                expires_at,
                is_primary,
                is_active,
                assigned_by,
                assigned_at,
                notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, TRUE, $10, $11, $12)
            "#,
        )
        .bind(created.assignment_id.as_uuid())
        .bind(tenant_id.as_uuid())
        .bind(vendor_id.map(|vendor_id| vendor_id.as_uuid()))
        .bind(created.staff_id.as_uuid())
        .bind(created.role_id.as_uuid())
        .bind(created.scope.as_ref().map(|scope| scope.kind.as_str()))
        .bind(created.scope.as_ref().and_then(|scope| scope.resource_id))
        .bind(created.expires_at)
        .bind(created.is_primary)
        .bind(created.assigned_by.map(|staff_id| staff_id.as_uuid()))
        .bind(created.assigned_at)
        .bind(created.notes.as_deref())
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            if is_unique_violation(&error) {
                return AppError::from(DenialReason::DuplicateAssignment);
            }
            AppError::Internal(format!("failed to assign role: {error}"))
        })?;

        commit(transaction).await?;
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
        let mut transaction = self.begin().await?;
        lock_staff_assignments(&mut transaction, tenant_id, staff_id).await?;

        let role = lock_role(&mut transaction, tenant_id, vendor_id, role_id).await?;
        let held =
            fetch_effective_assignments(&mut transaction, tenant_id, vendor_id, staff_id, now)
                .await?;
        let target = require_held(&held, staff_id, role_id)?;
        if is_self_removal && held.len() <= 1 {
            return Err(DenialReason::LastRoleRemoval.into());
        }

        guard(LockedAssignment {
            role: &role,
            already_assigned: true,
        })?;

        sqlx::query(
            r#"
            UPDATE rbac_role_assignments
            SET is_active = FALSE,
                is_primary = FALSE,
                deactivated_at = $2
            WHERE id = $1
            "#,
        )
        .bind(target.assignment_id.as_uuid())
        .bind(now)
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to remove assignment: {error}")))?;

        commit(transaction).await?;
        Ok(RoleAssignment {
            is_active: false,
            is_primary: false,
            ..target
        })
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
        let mut transaction = self.begin().await?;
        lock_staff_assignments(&mut transaction, tenant_id, staff_id).await?;

        let role = lock_role(&mut transaction, tenant_id, vendor_id, role_id).await?;
        let held =
            fetch_effective_assignments(&mut transaction, tenant_id, vendor_id, staff_id, now)
                .await?;
        let target = require_held(&held, staff_id, role_id)?;
        guard(LockedAssignment {
            role: &role,
            already_assigned: true,
        })?;

        let previous_role_id = demote_primary(&mut transaction, tenant_id, staff_id).await?;
        sqlx::query("UPDATE rbac_role_assignments SET is_primary = TRUE WHERE id = $1")
            .bind(target.assignment_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to mark primary role: {error}"))
            })?;

        commit(transaction).await?;
        Ok(PrimaryRoleChange {
            previous_role_id,
            assignment: RoleAssignment {
                is_primary: true,
                ..target
            },
        })
    }

    async fn deactivate_expired(&self, now: DateTime<Utc>) -> AppResult<Vec<RoleAssignment>> {
        let rows = sqlx::query_as::<_, AssignmentRow>(
            r#"
            UPDATE rbac_role_assignments
            SET is_active = FALSE,
                is_primary = FALSE,
                deactivated_at = $1
            WHERE is_active
                AND expires_at IS NOT NULL
                AND expires_at <= $1
            RETURNING
                id,
                tenant_id,
                vendor_id,
                staff_id,
                role_id,
                scope_kind,
                scope_resource_id,
                expires_at,
                is_primary,
                is_active,
                assigned_by,
                assigned_at,
                notes
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to deactivate expired assignments: {error}"))
        })?;

        into_assignments(rows)
    }
}
