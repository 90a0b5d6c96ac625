use async_trait::async_trait;
use staffguard_core::{AppResult, StaffId, TenantId};

/// Read port onto the staff profile service.
#[async_trait]
pub trait StaffDirectory: Send + Sync {
    /// Returns whether an active staff member exists in the tenant.
    async fn staff_exists(&self, tenant_id: TenantId, staff_id: StaffId) -> AppResult<bool>;
}
