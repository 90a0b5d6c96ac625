use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::PgConnection;

use staffguard_application::{RoleChange, RoleDeletion, RoleGuard, RoleRepository};
use staffguard_core::{AppError, AppResult, StaffId, TenantId, VendorId};
use staffguard_domain::{Permission, Role, RoleId, RoleSlug, RoleUpdate};

use super::{
    PostgresRbacRepository, RoleFilter, commit, fetch_roles, is_unique_violation, lock_role,
};

fn map_role_conflict(error: sqlx::Error, role_name: &str) -> AppError {
    if is_unique_violation(&error) {
        return AppError::Conflict(format!("role '{role_name}' already exists"));
    }

    AppError::Internal(format!("failed to create role: {error}"))
}

async fn insert_grants(
    connection: &mut PgConnection,
    role_id: RoleId,
    permissions: &BTreeSet<Permission>,
    granted_by: Option<StaffId>,
) -> AppResult<()> {
    for permission in permissions {
        sqlx::query(
            r#"
            INSERT INTO rbac_role_permissions (role_id, permission, granted_by)
            VALUES ($1, $2, $3)
            ON CONFLICT (role_id, permission) DO NOTHING
            "#,
        )
        .bind(role_id.as_uuid())
        .bind(permission.as_str())
        .bind(granted_by.map(|staff_id| staff_id.as_uuid()))
        .execute(&mut *connection)
        .await
        .map_err(|error| AppError::Internal(format!("failed to persist role grants: {error}")))?;
    }

    Ok(())
}

#[async_trait]
impl RoleRepository for PostgresRbacRepository {
    async fn find_role(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        role_id: RoleId,
    ) -> AppResult<Option<Role>> {
        let mut connection = self.acquire().await?;
        let roles = fetch_roles(
            &mut connection,
            tenant_id,
            vendor_id,
            RoleFilter {
                role_ids: Some(vec![role_id.as_uuid()]),
                ..RoleFilter::default()
            },
        )
        .await?;

        Ok(roles.into_iter().next())
    }

    async fn find_role_by_name(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        name: &RoleSlug,
    ) -> AppResult<Option<Role>> {
        let mut connection = self.acquire().await?;
        let roles = fetch_roles(
            &mut connection,
            tenant_id,
            vendor_id,
            RoleFilter {
                name: Some(name.as_str()),
                ..RoleFilter::default()
            },
        )
        .await?;

        Ok(roles.into_iter().max_by_key(|role| role.vendor_id.is_some()))
    }

    async fn list_roles(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
    ) -> AppResult<Vec<Role>> {
        let mut connection = self.acquire().await?;
        fetch_roles(&mut connection, tenant_id, vendor_id, RoleFilter::default()).await
    }

    async fn create_role(&self, role: Role) -> AppResult<Role> {
        let mut transaction = self.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO rbac_roles (
                id,
                tenant_id,
                vendor_id,
                name,
                display_name,
                description,
                priority_level,
                can_manage_staff,
                can_create_roles,
                can_delete_roles,
                max_assignable_priority,
                is_system,
                is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(role.role_id.as_uuid())
        .bind(role.tenant_id.as_uuid())
        .bind(role.vendor_id.map(|vendor_id| vendor_id.as_uuid()))
        .bind(role.name.as_str())
        .bind(role.display_name.as_str())
        .bind(role.description.as_deref())
        .bind(role.priority.value())
        .bind(role.capabilities.can_manage_staff)
        .bind(role.capabilities.can_create_roles)
        .bind(role.capabilities.can_delete_roles)
        .bind(role.max_assignable_priority.map(|priority| priority.value()))
        .bind(role.is_system)
        .bind(role.is_active)
        .execute(&mut *transaction)
        .await
        .map_err(|error| map_role_conflict(error, role.name.as_str()))?;

        insert_grants(&mut transaction, role.role_id, &role.permissions, None).await?;
        commit(transaction).await?;

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
        let mut transaction = self.begin().await?;
        let before = lock_role(&mut transaction, tenant_id, vendor_id, role_id).await?;
        guard(&before)?;
        let after = before.apply_update(update)?;

        sqlx::query(
            r#"
            UPDATE rbac_roles
            SET display_name = $2,
                description = $3,
                priority_level = $4,
                can_manage_staff = $5,
                can_create_roles = $6,
                can_delete_roles = $7,
                max_assignable_priority = $8,
                is_active = $9,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(role_id.as_uuid())
        .bind(after.display_name.as_str())
        .bind(after.description.as_deref())
        .bind(after.priority.value())
        .bind(after.capabilities.can_manage_staff)
        .bind(after.capabilities.can_create_roles)
        .bind(after.capabilities.can_delete_roles)
        .bind(after.max_assignable_priority.map(|priority| priority.value()))
        .bind(after.is_active)
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to update role: {error}")))?;

        commit(transaction).await?;
        Ok(RoleChange { before, after })
    }

    async fn replace_role_permissions(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        role_id: RoleId,
        permissions: BTreeSet<Permission>,
        granted_by: Option<StaffId>,
        guard: &RoleGuard<'_>,
    ) -> AppResult<RoleChange> {
        let mut transaction = self.begin().await?;
        let before = lock_role(&mut transaction, tenant_id, vendor_id, role_id).await?;
        guard(&before)?;

        sqlx::query("DELETE FROM rbac_role_permissions WHERE role_id = $1")
            .bind(role_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to clear role grants: {error}"))
            })?;
        insert_grants(&mut transaction, role_id, &permissions, granted_by).await?;

        sqlx::query("UPDATE rbac_roles SET updated_at = now() WHERE id = $1")
            .bind(role_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| AppError::Internal(format!("failed to touch role: {error}")))?;

        commit(transaction).await?;
        let after = Role {
            permissions,
            ..before.clone()
        };
        Ok(RoleChange { before, after })
    }

    async fn delete_role(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        role_id: RoleId,
        guard: &RoleGuard<'_>,
    ) -> AppResult<RoleDeletion> {
        let mut transaction = self.begin().await?;
        let role = lock_role(&mut transaction, tenant_id, vendor_id, role_id).await?;
        guard(&role)?;

        let active_assignments = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM rbac_role_assignments
            WHERE role_id = $1
                AND is_active
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to count role assignments: {error}"))
        })?;

        let deletion = if active_assignments > 0 {
            sqlx::query(
                "UPDATE rbac_roles SET is_active = FALSE, updated_at = now() WHERE id = $1",
            )
            .bind(role_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| AppError::Internal(format!("failed to deactivate role: {error}")))?;
            RoleDeletion::Deactivated(role)
        } else {
            sqlx::query("DELETE FROM rbac_roles WHERE id = $1")
                .bind(role_id.as_uuid())
                .execute(&mut *transaction)
                .await
                .map_err(|error| AppError::Internal(format!("failed to delete role: {error}")))?;
            RoleDeletion::Deleted(role)
        };

        commit(transaction).await?;
        Ok(deletion)
    }
}
