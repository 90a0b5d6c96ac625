use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use staffguard_core::{AppError, AppResult, StaffId, StaffPrincipal, TenantId, VendorId};
use staffguard_domain::{
    EffectivePermissions, Permission, RoleMutation, StaffScope, authorize_role_mutation,
};
use tracing::{debug, warn};

use crate::{AssignmentLedger, PermissionCache, PermissionCacheSettings};

/// Outcome of a synchronous cache invalidation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheInvalidation {
    /// Entries were dropped.
    Completed,
    /// The backend did not answer in time; stale entries may survive until ttl.
    TimedOut,
    /// The backend reported an error; stale entries may survive until ttl.
    Failed(String),
}

impl CacheInvalidation {
    /// Returns whether stale snapshots may still be served.
    #[must_use]
    pub fn is_stale_read_risk(&self) -> bool {
        !matches!(self, Self::Completed)
    }
}

/// Calculator and cache facade for effective permissions.
#[derive(Clone)]
pub struct EffectivePermissionService {
    ledger: Arc<dyn AssignmentLedger>,
    cache: Arc<dyn PermissionCache>,
    settings: PermissionCacheSettings,
}

impl EffectivePermissionService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        ledger: Arc<dyn AssignmentLedger>,
        cache: Arc<dyn PermissionCache>,
        settings: PermissionCacheSettings,
    ) -> Self {
        Self {
            ledger,
            cache,
            settings,
        }
    }

    /// Resolves effective permissions straight from the ledger.
    pub async fn compute(&self, scope: StaffScope) -> AppResult<EffectivePermissions> {
        let now = Utc::now();
        let grants = self
            .ledger
            .list_active_grants(scope.tenant_id, scope.vendor_id, scope.staff_id, now)
            .await?;

        Ok(EffectivePermissions::resolve(scope, &grants, now))
    }

    /// Returns the cached snapshot, computing and storing it on a miss.
    ///
    /// Cache failures degrade to a direct computation.
    pub async fn get(&self, scope: StaffScope) -> AppResult<EffectivePermissions> {
        match self.cache.get(scope).await {
            Ok(Some(snapshot)) => return Ok(snapshot),
            Ok(None) => {}
            Err(error) => warn!(
                tenant_id = %scope.tenant_id,
                staff_id = %scope.staff_id,
                error = %error,
                "permission cache read failed, computing directly"
            ),
        }

        let observed_epoch = match self.cache.epoch(scope.tenant_id).await {
            Ok(epoch) => Some(epoch),
            Err(error) => {
                warn!(
                    tenant_id = %scope.tenant_id,
                    error = %error,
                    "permission cache epoch unavailable, skipping store"
                );
                None
            }
        };

        let snapshot = self.compute(scope).await?;

        if let Some(observed_epoch) = observed_epoch
            && self.settings.ttl_seconds > 0
        {
            match self
                .cache
                .store_if_current(&snapshot, observed_epoch, self.settings.ttl_seconds)
                .await
            {
                Ok(true) => {}
                Ok(false) => debug!(
                    tenant_id = %scope.tenant_id,
                    staff_id = %scope.staff_id,
                    "discarded permission snapshot computed across an invalidation"
                ),
                Err(error) => warn!(
                    tenant_id = %scope.tenant_id,
                    staff_id = %scope.staff_id,
                    error = %error,
                    "failed to store permission snapshot"
                ),
            }
        }

        Ok(snapshot)
    }

    /// Returns effective permissions of the acting principal.
    pub async fn for_principal(&self, actor: &StaffPrincipal) -> AppResult<EffectivePermissions> {
        self.get(StaffScope {
            tenant_id: actor.tenant_id(),
            vendor_id: actor.vendor_id(),
            staff_id: actor.staff_id(),
        })
        .await
    }

    /// Ensures the principal holds a catalog permission and returns the snapshot.
    pub async fn require_permission(
        &self,
        actor: &StaffPrincipal,
        permission: Permission,
    ) -> AppResult<EffectivePermissions> {
        let resolved = self.for_principal(actor).await?;
        if !resolved.has_permission(permission) {
            return Err(AppError::Forbidden(format!(
                "staff '{}' is missing permission '{}' in tenant '{}'",
                actor.staff_id(),
                permission.as_str(),
                actor.tenant_id()
            )));
        }

        Ok(resolved)
    }

    /// Checks a role mutation against the principal's current authority.
    pub async fn authorize(
        &self,
        actor: &StaffPrincipal,
        mutation: &RoleMutation<'_>,
    ) -> AppResult<()> {
        let resolved = self.for_principal(actor).await?;
        authorize_role_mutation(actor.staff_id(), &resolved, mutation)?;
        Ok(())
    }

    /// Drops a staff member's cached snapshots within the staff timeout.
    pub async fn invalidate_staff(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        staff_id: StaffId,
    ) -> CacheInvalidation {
        let outcome = bounded(
            self.settings.staff_invalidation_timeout,
            self.cache.invalidate_staff(tenant_id, vendor_id, staff_id),
        )
        .await;

        if outcome.is_stale_read_risk() {
            warn!(
                tenant_id = %tenant_id,
                staff_id = %staff_id,
                outcome = ?outcome,
                stale_read_risk = true,
                "staff permission cache invalidation did not complete"
            );
        }

        outcome
    }

    /// Drops every cached snapshot of a tenant within the tenant timeout.
    pub async fn invalidate_tenant(&self, tenant_id: TenantId) -> CacheInvalidation {
        let outcome = bounded(
            self.settings.tenant_invalidation_timeout,
            self.cache.invalidate_tenant(tenant_id),
        )
        .await;

        if outcome.is_stale_read_risk() {
            warn!(
                tenant_id = %tenant_id,
                outcome = ?outcome,
                stale_read_risk = true,
                "tenant permission cache invalidation did not complete"
            );
        }

        outcome
    }
}

async fn bounded(
    limit: Duration,
    invalidation: impl Future<Output = AppResult<()>>,
) -> CacheInvalidation {
    match tokio::time::timeout(limit, invalidation).await {
        Ok(Ok(())) => CacheInvalidation::Completed,
        Ok(Err(error)) => CacheInvalidation::Failed(error.to_string()),
        Err(_) => CacheInvalidation::TimedOut,
    }
}
