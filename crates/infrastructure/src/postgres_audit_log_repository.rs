use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use staffguard_application::{AuditLogEntry, AuditLogQuery, AuditLogRepository};
use staffguard_core::{AppError, AppResult, StaffId, TenantId, VendorId};

#[cfg(test)]
mod tests;

/// PostgreSQL-backed repository for audit log read models.
#[derive(Clone)]
pub struct PostgresAuditLogRepository {
    pool: PgPool,
}

impl PostgresAuditLogRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AuditLogRow {
    event_id: uuid::Uuid,
    vendor_id: Option<uuid::Uuid>,
    action: String,
    entity_type: String,
    entity_id: String,
    target_staff_id: Option<uuid::Uuid>,
    performed_by: Option<uuid::Uuid>,
    old_value: Option<String>,
    new_value: Option<String>,
    created_at: String,
}

fn decode_snapshot(value: Option<String>) -> AppResult<Option<serde_json::Value>> {
    value
        .as_deref()
        .map(|value| {
            serde_json::from_str(value).map_err(|error| {
                AppError::Internal(format!("invalid stored audit snapshot: {error}"))
            })
        })
        .transpose()
}

impl TryFrom<AuditLogRow> for AuditLogEntry {
    type Error = AppError;

    fn try_from(row: AuditLogRow) -> Result<Self, Self::Error> {
        Ok(Self {
            event_id: row.event_id.to_string(),
            vendor_id: row.vendor_id.map(VendorId::from_uuid),
            action: row.action,
            entity_type: row.entity_type,
            entity_id: row.entity_id,
            target_staff_id: row.target_staff_id.map(StaffId::from_uuid),
            performed_by: row.performed_by.map(StaffId::from_uuid),
            old_value: decode_snapshot(row.old_value)?,
            new_value: decode_snapshot(row.new_value)?,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl AuditLogRepository for PostgresAuditLogRepository {
    async fn list_recent_entries(
        &self,
        tenant_id: TenantId,
        query: AuditLogQuery,
    ) -> AppResult<Vec<AuditLogEntry>> {
        let capped_limit = query.limit.clamp(1, 200) as i64;
        let capped_offset = query.offset.min(5_000) as i64;
        let rows = sqlx::query_as::<_, AuditLogRow>(
            r#"
            SELECT
                id AS event_id,
                vendor_id,
                action,
                entity_type,
                entity_id,
                target_staff_id,
                performed_by,
                old_value::TEXT AS old_value,
                new_value::TEXT AS new_value,
                to_char(created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
            FROM rbac_audit_log
            WHERE tenant_id = $1
                AND ($2::TEXT IS NULL OR action = $2)
                AND ($3::TEXT IS NULL OR entity_type = $3)
                AND ($4::UUID IS NULL OR target_staff_id = $4)
            ORDER BY rbac_audit_log.created_at DESC, id
            LIMIT $5
            OFFSET $6
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(query.action.map(|action| action.as_str()))
        .bind(query.entity_type.map(|entity_type| entity_type.as_str()))
        .bind(query.target_staff_id.map(|staff_id| staff_id.as_uuid()))
        .bind(capped_limit)
        .bind(capped_offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list audit log entries: {error}"))
        })?;

        rows.into_iter().map(AuditLogEntry::try_from).collect()
    }
}
