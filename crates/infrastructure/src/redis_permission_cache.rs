//! Redis-backed effective permission cache shared by every API replica.

use async_trait::async_trait;
use redis::{AsyncCommands, Script};
use staffguard_application::PermissionCache;
use staffguard_core::{AppError, AppResult, StaffId, TenantId, VendorId};
use staffguard_domain::{EffectivePermissions, StaffScope};

// KEYS[1] = tenant epoch, KEYS[2] = entry; ARGV = observed epoch, payload, ttl.
const STORE_IF_CURRENT_SCRIPT: &str = r#"
local current = redis.call('GET', KEYS[1])
if current == false then
  current = '0'
end
if current ~= ARGV[1] then
  return 0
end
redis.call('SET', KEYS[2], ARGV[2], 'EX', ARGV[3])
return 1
"#;

const SCAN_BATCH_SIZE: usize = 200;

/// Redis implementation of the effective permission cache port.
///
/// Entries live under `{prefix}:{tenant}:{vendor|global}:{staff}`; the
/// tenant epoch lives under `{prefix}:epoch:{tenant}` so tenant-wide
/// deletes never touch it.
#[derive(Clone)]
pub struct RedisPermissionCache {
    client: redis::Client,
    key_prefix: String,
}

impl RedisPermissionCache {
    /// Creates a cache adapter with a configured Redis client and key prefix.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    fn entry_key(&self, scope: StaffScope) -> String {
        let vendor = scope
            .vendor_id
            .map_or_else(|| "global".to_owned(), |vendor_id| vendor_id.to_string());
        format!(
            "{}:{}:{vendor}:{}",
            self.key_prefix, scope.tenant_id, scope.staff_id
        )
    }

    fn epoch_key(&self, tenant_id: TenantId) -> String {
        format!("{}:epoch:{tenant_id}", self.key_prefix)
    }

    fn staff_pattern(&self, tenant_id: TenantId, staff_id: StaffId) -> String {
        format!("{}:{tenant_id}:*:{staff_id}", self.key_prefix)
    }

    fn tenant_pattern(&self, tenant_id: TenantId) -> String {
        format!("{}:{tenant_id}:*", self.key_prefix)
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Internal(format!("failed to connect to redis: {error}")))
    }

    async fn advance_epoch(
        &self,
        connection: &mut redis::aio::MultiplexedConnection,
        tenant_id: TenantId,
    ) -> AppResult<()> {
        let _: u64 = connection
            .incr(self.epoch_key(tenant_id), 1)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to advance permission cache epoch for tenant '{tenant_id}': {error}"
                ))
            })?;

        Ok(())
    }

    async fn delete_matching(
        &self,
        connection: &mut redis::aio::MultiplexedConnection,
        pattern: &str,
    ) -> AppResult<usize> {
        let mut cursor: u64 = 0;
        let mut deleted = 0;
        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH_SIZE)
                .query_async(&mut *connection)
                .await
                .map_err(|error| {
                    AppError::Internal(format!(
                        "failed to scan permission cache keys '{pattern}': {error}"
                    ))
                })?;

            if !keys.is_empty() {
                let removed: usize = connection.del(keys).await.map_err(|error| {
                    AppError::Internal(format!(
                        "failed to delete permission cache keys '{pattern}': {error}"
                    ))
                })?;
                deleted += removed;
            }

            if next_cursor == 0 {
                return Ok(deleted);
            }
            cursor = next_cursor;
        }
    }
}

#[async_trait]
impl PermissionCache for RedisPermissionCache {
    async fn get(&self, scope: StaffScope) -> AppResult<Option<EffectivePermissions>> {
        let mut connection = self.connection().await?;
        let encoded: Option<String> = connection
            .get(self.entry_key(scope))
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to read permission cache entry: {error}"))
            })?;

        encoded
            .as_deref()
            .map(|value| {
                serde_json::from_str::<EffectivePermissions>(value).map_err(|error| {
                    AppError::Internal(format!("invalid permission cache entry: {error}"))
                })
            })
            .transpose()
    }

    async fn epoch(&self, tenant_id: TenantId) -> AppResult<u64> {
        let mut connection = self.connection().await?;
        let epoch: Option<u64> = connection
            .get(self.epoch_key(tenant_id))
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to read permission cache epoch: {error}"))
            })?;

        Ok(epoch.unwrap_or(0))
    }

    async fn store_if_current(
        &self,
        snapshot: &EffectivePermissions,
        observed_epoch: u64,
        ttl_seconds: u32,
    ) -> AppResult<bool> {
        if ttl_seconds == 0 {
            return Ok(false);
        }

        let payload = serde_json::to_string(snapshot).map_err(|error| {
            AppError::Internal(format!("failed to encode permission cache entry: {error}"))
        })?;
        let mut connection = self.connection().await?;
        let stored = Script::new(STORE_IF_CURRENT_SCRIPT)
            .key(self.epoch_key(snapshot.tenant_id))
            .key(self.entry_key(snapshot.scope()))
            .arg(observed_epoch)
            .arg(payload)
            .arg(ttl_seconds)
            .invoke_async::<i32>(&mut connection)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to write permission cache entry: {error}"))
            })?;

        Ok(stored == 1)
    }

    async fn invalidate_staff(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        staff_id: StaffId,
    ) -> AppResult<()> {
        let mut connection = self.connection().await?;
        self.advance_epoch(&mut connection, tenant_id).await?;

        match vendor_id {
            Some(vendor_id) => {
                let key = self.entry_key(StaffScope {
                    tenant_id,
                    vendor_id: Some(vendor_id),
                    staff_id,
                });
                connection.del(key).await.map_err(|error| {
                    AppError::Internal(format!(
                        "failed to delete permission cache entry: {error}"
                    ))
                })
            }
            None => {
                let pattern = self.staff_pattern(tenant_id, staff_id);
                self.delete_matching(&mut connection, &pattern)
                    .await
                    .map(|_| ())
            }
        }
    }

    async fn invalidate_tenant(&self, tenant_id: TenantId) -> AppResult<()> {
        let mut connection = self.connection().await?;
        self.advance_epoch(&mut connection, tenant_id).await?;

        let pattern = self.tenant_pattern(tenant_id);
        let deleted = self.delete_matching(&mut connection, &pattern).await?;
        tracing::debug!(%tenant_id, deleted, "dropped tenant permission cache entries");
        Ok(())
    }
}
