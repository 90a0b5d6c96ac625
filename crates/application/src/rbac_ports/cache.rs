use async_trait::async_trait;
use staffguard_core::{AppResult, StaffId, TenantId, VendorId};
use staffguard_domain::{EffectivePermissions, StaffScope};

/// Cache port for effective permission snapshots.
///
/// Each tenant carries an epoch that every invalidation advances. A snapshot
/// is stored only when the epoch observed before computing it is still
/// current, so a recompute that raced a mutation is discarded.
#[async_trait]
pub trait PermissionCache: Send + Sync {
    /// Returns the cached snapshot for one key.
    async fn get(&self, scope: StaffScope) -> AppResult<Option<EffectivePermissions>>;

    /// Returns the current invalidation epoch of a tenant.
    async fn epoch(&self, tenant_id: TenantId) -> AppResult<u64>;

    /// Stores a snapshot if `observed_epoch` is still current.
    /// Returns whether the snapshot was stored.
    async fn store_if_current(
        &self,
        snapshot: &EffectivePermissions,
        observed_epoch: u64,
        ttl_seconds: u32,
    ) -> AppResult<bool>;

    /// Drops a staff member's entries. Without a vendor, every vendor
    /// variant of the staff member is dropped.
    async fn invalidate_staff(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        staff_id: StaffId,
    ) -> AppResult<()>;

    /// Drops every entry of a tenant.
    async fn invalidate_tenant(&self, tenant_id: TenantId) -> AppResult<()>;
}
