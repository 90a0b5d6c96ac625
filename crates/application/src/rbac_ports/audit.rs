use async_trait::async_trait;
use chrono::{DateTime, Utc};
use staffguard_core::{AppResult, StaffId, TenantId, VendorId};
use staffguard_domain::{AuditAction, AuditEntityType, AuditSnapshot};

/// Immutable audit event payload emitted by application services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    /// Tenant scope for the event.
    pub tenant_id: TenantId,
    /// Vendor scope for the event.
    pub vendor_id: Option<VendorId>,
    /// Stable audit action identifier.
    pub action: AuditAction,
    /// Kind of entity affected.
    pub entity_type: AuditEntityType,
    /// Identifier of the affected entity.
    pub entity_id: String,
    /// Staff member affected, for assignment events.
    pub target_staff_id: Option<StaffId>,
    /// Acting staff member; absent for system actions.
    pub performed_by: Option<StaffId>,
    /// State before the change.
    pub old_value: Option<AuditSnapshot>,
    /// State after the change.
    pub new_value: Option<AuditSnapshot>,
    /// Instant the change was committed.
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        action: AuditAction,
        entity_type: AuditEntityType,
        entity_id: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id,
            vendor_id,
            action,
            entity_type,
            entity_id: entity_id.into(),
            target_staff_id: None,
            performed_by: None,
            old_value: None,
            new_value: None,
            occurred_at: Utc::now(),
        }
    }

    /// Records the acting staff member.
    #[must_use]
    pub fn performed_by(mut self, staff_id: StaffId) -> Self {
        self.performed_by = Some(staff_id);
        self
    }

    /// Records the affected staff member.
    #[must_use]
    pub fn targeting(mut self, staff_id: StaffId) -> Self {
        self.target_staff_id = Some(staff_id);
        self
    }

    /// Attaches the state before the change.
    #[must_use]
    pub fn with_old_value(mut self, snapshot: AuditSnapshot) -> Self {
        self.old_value = Some(snapshot);
        self
    }

    /// Attaches the state after the change.
    #[must_use]
    pub fn with_new_value(mut self, snapshot: AuditSnapshot) -> Self {
        self.new_value = Some(snapshot);
        self
    }
}

/// Port for persisting append-only audit events.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Persists one audit event.
    async fn append_event(&self, event: AuditEvent) -> AppResult<()>;
}

/// Audit log entry projection for administrative views.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditLogEntry {
    /// Stable event identifier.
    pub event_id: String,
    /// Vendor scope.
    pub vendor_id: Option<VendorId>,
    /// Stable action identifier.
    pub action: String,
    /// Entity type label.
    pub entity_type: String,
    /// Entity identifier.
    pub entity_id: String,
    /// Affected staff member.
    pub target_staff_id: Option<StaffId>,
    /// Acting staff member.
    pub performed_by: Option<StaffId>,
    /// Previous state as JSON.
    pub old_value: Option<serde_json::Value>,
    /// New state as JSON.
    pub new_value: Option<serde_json::Value>,
    /// Event timestamp in RFC3339.
    pub created_at: String,
}

/// Query parameters for audit log listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditLogQuery {
    /// Maximum rows returned.
    pub limit: usize,
    /// Number of rows skipped for offset pagination.
    pub offset: usize,
    /// Optional action filter.
    pub action: Option<AuditAction>,
    /// Optional entity type filter.
    pub entity_type: Option<AuditEntityType>,
    /// Optional affected staff filter.
    pub target_staff_id: Option<StaffId>,
}

/// Repository port for reading tenant audit logs.
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Lists most recent tenant audit entries.
    async fn list_recent_entries(
        &self,
        tenant_id: TenantId,
        query: AuditLogQuery,
    ) -> AppResult<Vec<AuditLogEntry>>;
}
