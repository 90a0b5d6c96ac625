//! Domain entities and invariants for tenant-scoped RBAC.

#![forbid(unsafe_code)]

mod assignment;
mod audit;
mod boundary;
mod effective;
mod organization;
mod permission;
mod role;
mod seed;

pub use assignment::{
    AssignmentId, AssignmentScope, NewAssignment, RoleAssignment, RoleGrant, StaffScope,
    vendor_visible,
};
pub use audit::{AuditAction, AuditEntityType, AuditSnapshot};
pub use boundary::{RoleMutation, authorize_role_mutation};
pub use effective::EffectivePermissions;
pub use organization::{
    Department, DepartmentForest, DepartmentHierarchy, DepartmentId, DepartmentUpdate, Team,
    TeamId, TeamUpdate,
};
pub use permission::{
    Permission, PermissionCategory, PermissionDefinition, PermissionId, permission_catalog,
};
pub use role::{
    MAX_PRIORITY_LEVEL, PriorityLevel, Role, RoleCapabilities, RoleDraft, RoleId, RoleSlug,
    RoleUpdate,
};
pub use seed::{DEFAULT_ROLE_TEMPLATES, DefaultRoleTemplate, TemplateScope, default_role_templates};
