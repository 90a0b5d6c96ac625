//! Application services and ports.

#![forbid(unsafe_code)]

mod assignment_service;
mod audit_dispatcher;
mod claim_mapping;
mod claim_sync_service;
mod config;
mod effective_permission_service;
mod organization_service;
mod rbac_ports;
mod role_admin_service;

#[cfg(test)]
mod test_support;

pub use assignment_service::{AssignRoleInput, AssignmentService};
pub use audit_dispatcher::{AuditDispatcher, AuditDrain};
pub use claim_mapping::{ClaimMapping, ClaimMappingTable, ClaimScope, PLATFORM_OWNER_CLAIM};
pub use claim_sync_service::{
    ClaimSkipReason, ClaimSyncReport, ClaimSyncRequest, ClaimSyncService, SkippedClaim,
};
pub use config::{AuditDispatcherSettings, PermissionCacheSettings};
pub use effective_permission_service::{CacheInvalidation, EffectivePermissionService};
pub use organization_service::{CreateDepartmentInput, CreateTeamInput, OrganizationService};
pub use rbac_ports::{
    AssignmentGuard, AssignmentLedger, AuditEvent, AuditLogEntry, AuditLogQuery,
    AuditLogRepository, AuditRepository, DepartmentChange, DepartmentRepository, LockedAssignment,
    PermissionCache, PrimaryRoleChange, RoleChange, RoleDeletion, RoleGuard, RoleRepository,
    StaffDirectory, TeamChange,
};
pub use role_admin_service::{CreateRoleInput, RoleAdminService, SeedReport, UpdateRoleInput};
