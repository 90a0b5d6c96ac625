use std::str::FromStr;

use serde::{Deserialize, Serialize};
use staffguard_core::{AppError, AppResult};
use uuid::Uuid;

staffguard_core::uuid_identifier!(
    /// Stable identifier of one catalog permission.
    PermissionId
);

const PERMISSION_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a4e_93b7_4d1a_b0c5_7e2f_41a9_d803);

/// Groups used to present the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionCategory {
    /// Staff records and invitations.
    Staff,
    /// Roles and role assignments.
    Roles,
    /// Departments and teams.
    Organization,
    /// Staff documents.
    Documents,
    /// Audit trail.
    Audit,
    /// Tenant settings.
    Settings,
}

impl PermissionCategory {
    /// Returns a stable storage value for this category.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Staff => "staff",
            Self::Roles => "roles",
            Self::Organization => "organization",
            Self::Documents => "documents",
            Self::Audit => "audit",
            Self::Settings => "settings",
        }
    }
}

/// Fixed permission catalog granted to roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Permission {
    /// Allows reading staff records.
    #[serde(rename = "team:staff:view")]
    StaffView,
    /// Allows creating staff records.
    #[serde(rename = "team:staff:create")]
    StaffCreate,
    /// Allows editing staff records.
    #[serde(rename = "team:staff:edit")]
    StaffEdit,
    /// Allows deleting staff records.
    #[serde(rename = "team:staff:delete")]
    StaffDelete,
    /// Allows sending and revoking invitations.
    #[serde(rename = "team:invitations:manage")]
    InvitationsManage,
    /// Allows reading roles and the permission catalog.
    #[serde(rename = "team:roles:view")]
    RolesView,
    /// Allows editing roles and their permission sets.
    #[serde(rename = "team:roles:manage")]
    RolesManage,
    /// Allows assigning roles to staff.
    #[serde(rename = "team:roles:assign")]
    RolesAssign,
    /// Allows reading departments.
    #[serde(rename = "team:departments:view")]
    DepartmentsView,
    /// Allows mutating departments.
    #[serde(rename = "team:departments:manage")]
    DepartmentsManage,
    /// Allows reading teams.
    #[serde(rename = "team:teams:view")]
    TeamsView,
    /// Allows mutating teams.
    #[serde(rename = "team:teams:manage")]
    TeamsManage,
    /// Allows reading staff documents.
    #[serde(rename = "team:documents:view")]
    DocumentsView,
    /// Allows verifying staff documents.
    #[serde(rename = "team:documents:verify")]
    DocumentsVerify,
    /// Allows reading the audit trail.
    #[serde(rename = "team:audit:view")]
    AuditView,
    /// Allows reading tenant settings.
    #[serde(rename = "settings:view")]
    SettingsView,
    /// Allows changing tenant settings.
    #[serde(rename = "settings:manage")]
    SettingsManage,
}

impl Permission {
    /// Returns the unique catalog name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StaffView => "team:staff:view",
            Self::StaffCreate => "team:staff:create",
            Self::StaffEdit => "team:staff:edit",
            Self::StaffDelete => "team:staff:delete",
            Self::InvitationsManage => "team:invitations:manage",
            Self::RolesView => "team:roles:view",
            Self::RolesManage => "team:roles:manage",
            Self::RolesAssign => "team:roles:assign",
            Self::DepartmentsView => "team:departments:view",
            Self::DepartmentsManage => "team:departments:manage",
            Self::TeamsView => "team:teams:view",
            Self::TeamsManage => "team:teams:manage",
            Self::DocumentsView => "team:documents:view",
            Self::DocumentsVerify => "team:documents:verify",
            Self::AuditView => "team:audit:view",
            Self::SettingsView => "settings:view",
            Self::SettingsManage => "settings:manage",
        }
    }

    /// Returns all catalog permissions.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        const ALL: &[Permission] = &[
            Permission::StaffView,
            Permission::StaffCreate,
            Permission::StaffEdit,
            Permission::StaffDelete,
            Permission::InvitationsManage,
            Permission::RolesView,
            Permission::RolesManage,
            Permission::RolesAssign,
            Permission::DepartmentsView,
            Permission::DepartmentsManage,
            Permission::TeamsView,
            Permission::TeamsManage,
            Permission::DocumentsView,
            Permission::DocumentsVerify,
            Permission::AuditView,
            Permission::SettingsView,
            Permission::SettingsManage,
        ];

        ALL
    }

    /// Returns the deterministic catalog identifier.
    #[must_use]
    pub fn id(&self) -> PermissionId {
        PermissionId::from_uuid(Uuid::new_v5(
            &PERMISSION_NAMESPACE,
            self.as_str().as_bytes(),
        ))
    }

    /// Resolves a catalog identifier back to its permission.
    pub fn from_id(permission_id: PermissionId) -> AppResult<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|permission| permission.id() == permission_id)
            .ok_or_else(|| {
                AppError::Validation(format!("unknown permission id '{permission_id}'"))
            })
    }

    /// Returns the catalog category.
    #[must_use]
    pub fn category(&self) -> PermissionCategory {
        match self {
            Self::StaffView
            | Self::StaffCreate
            | Self::StaffEdit
            | Self::StaffDelete
            | Self::InvitationsManage => PermissionCategory::Staff,
            Self::RolesView | Self::RolesManage | Self::RolesAssign => PermissionCategory::Roles,
            Self::DepartmentsView
            | Self::DepartmentsManage
            | Self::TeamsView
            | Self::TeamsManage => PermissionCategory::Organization,
            Self::DocumentsView | Self::DocumentsVerify => PermissionCategory::Documents,
            Self::AuditView => PermissionCategory::Audit,
            Self::SettingsView | Self::SettingsManage => PermissionCategory::Settings,
        }
    }

    /// Returns whether granting this permission deserves extra review.
    #[must_use]
    pub fn is_sensitive(&self) -> bool {
        matches!(
            self,
            Self::StaffDelete
                | Self::RolesManage
                | Self::RolesAssign
                | Self::DocumentsVerify
                | Self::SettingsManage
        )
    }
}

impl FromStr for Permission {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|permission| permission.as_str() == value)
            .ok_or_else(|| AppError::Validation(format!("unknown permission value '{value}'")))
    }
}

/// Catalog entry projection with identifier and grouping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDefinition {
    /// Deterministic identifier.
    pub permission_id: PermissionId,
    /// Permission.
    pub permission: Permission,
    /// Catalog category.
    pub category: PermissionCategory,
    /// Whether the permission is flagged as sensitive.
    pub is_sensitive: bool,
}

impl From<Permission> for PermissionDefinition {
    fn from(permission: Permission) -> Self {
        Self {
            permission_id: permission.id(),
            permission,
            category: permission.category(),
            is_sensitive: permission.is_sensitive(),
        }
    }
}

/// Returns the full catalog ordered by category.
#[must_use]
pub fn permission_catalog() -> Vec<PermissionDefinition> {
    let mut catalog: Vec<PermissionDefinition> = Permission::all()
        .iter()
        .copied()
        .map(PermissionDefinition::from)
        .collect();
    catalog.sort_by_key(|definition| (definition.category, definition.permission));
    catalog
}
