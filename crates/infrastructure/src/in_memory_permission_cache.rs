use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use staffguard_application::PermissionCache;
use staffguard_core::{AppResult, StaffId, TenantId, VendorId};
use staffguard_domain::{EffectivePermissions, StaffScope};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct PermissionCacheEntry {
    snapshot: EffectivePermissions,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct PermissionCacheState {
    entries: HashMap<StaffScope, PermissionCacheEntry>,
    epochs: HashMap<TenantId, u64>,
}

impl PermissionCacheState {
    fn epoch(&self, tenant_id: TenantId) -> u64 {
        self.epochs.get(&tenant_id).copied().unwrap_or(0)
    }

    fn advance_epoch(&mut self, tenant_id: TenantId) {
        let epoch = self.epochs.entry(tenant_id).or_insert(0);
        *epoch = epoch.wrapping_add(1);
    }
}

/// In-memory effective permission cache for single-process deployments.
#[derive(Debug, Default)]
pub struct InMemoryPermissionCache {
    state: RwLock<PermissionCacheState>,
}

impl InMemoryPermissionCache {
    /// Creates an empty in-memory permission cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PermissionCache for InMemoryPermissionCache {
    async fn get(&self, scope: StaffScope) -> AppResult<Option<EffectivePermissions>> {
        {
            let state = self.state.read().await;
            match state.entries.get(&scope) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Ok(Some(entry.snapshot.clone()));
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }

        let mut state = self.state.write().await;
        if state
            .entries
            .get(&scope)
            .is_some_and(|entry| entry.expires_at <= Instant::now())
        {
            state.entries.remove(&scope);
        }

        Ok(None)
    }

    async fn epoch(&self, tenant_id: TenantId) -> AppResult<u64> {
        Ok(self.state.read().await.epoch(tenant_id))
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

        let mut state = self.state.write().await;
        if state.epoch(snapshot.tenant_id) != observed_epoch {
            return Ok(false);
        }

        let now = Instant::now();
        state.entries.retain(|_, entry| entry.expires_at > now);
        let expires_at = now
            .checked_add(Duration::from_secs(u64::from(ttl_seconds)))
            .unwrap_or(now);
        state.entries.insert(
            snapshot.scope(),
            PermissionCacheEntry {
                snapshot: snapshot.clone(),
                expires_at,
            },
        );

        Ok(true)
    }

    async fn invalidate_staff(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        staff_id: StaffId,
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.advance_epoch(tenant_id);
        state.entries.retain(|scope, _| {
            !(scope.tenant_id == tenant_id
                && scope.staff_id == staff_id
                && vendor_id.is_none_or(|vendor_id| scope.vendor_id == Some(vendor_id)))
        });
        Ok(())
    }

    async fn invalidate_tenant(&self, tenant_id: TenantId) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.advance_epoch(tenant_id);
        state.entries.retain(|scope, _| scope.tenant_id != tenant_id);
        Ok(())
    }
}
