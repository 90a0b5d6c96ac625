mod assignments;
mod audit;
mod cache;
mod organization;
mod roles;
mod staff;

pub use assignments::{AssignmentGuard, AssignmentLedger, LockedAssignment, PrimaryRoleChange};
pub use audit::{AuditEvent, AuditLogEntry, AuditLogQuery, AuditLogRepository, AuditRepository};
pub use cache::PermissionCache;
pub use organization::{DepartmentChange, DepartmentRepository, TeamChange};
pub use roles::{RoleChange, RoleDeletion, RoleGuard, RoleRepository};
pub use staff::StaffDirectory;
