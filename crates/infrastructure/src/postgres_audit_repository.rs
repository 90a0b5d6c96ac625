use async_trait::async_trait;
use sqlx::PgPool;

use staffguard_application::{AuditEvent, AuditRepository};
use staffguard_core::{AppError, AppResult};
use staffguard_domain::AuditSnapshot;

/// PostgreSQL-backed append-only audit repository.
#[derive(Clone)]
pub struct PostgresAuditRepository {
    pool: PgPool,
}

impl PostgresAuditRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn encode_snapshot(snapshot: Option<&AuditSnapshot>) -> AppResult<Option<String>> {
    snapshot
        .map(|snapshot| {
            serde_json::to_string(snapshot).map_err(|error| {
                AppError::Internal(format!("failed to encode audit snapshot: {error}"))
            })
        })
        .transpose()
}

#[async_trait]
impl AuditRepository for PostgresAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        let old_value = encode_snapshot(event.old_value.as_ref())?;
        let new_value = encode_snapshot(event.new_value.as_ref())?;

        sqlx::query(
            r#"
            INSERT INTO rbac_audit_log (
                tenant_id,
                vendor_id,
                action,
                entity_type,
                entity_id,
                target_staff_id,
                performed_by,
                old_value,
                new_value,
                created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8::jsonb, $9::jsonb, $10)
            "#,
        )
        .bind(event.tenant_id.as_uuid())
        .bind(event.vendor_id.map(|vendor_id| vendor_id.as_uuid()))
        .bind(event.action.as_str())
        .bind(event.entity_type.as_str())
        .bind(event.entity_id)
        .bind(event.target_staff_id.map(|staff_id| staff_id.as_uuid()))
        .bind(event.performed_by.map(|staff_id| staff_id.as_uuid()))
        .bind(old_value)
        .bind(new_value)
        .bind(event.occurred_at)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to append audit event: {error}")))?;

        Ok(())
    }
}
