//! Default role templates installed when a tenant or vendor is onboarded.

use std::collections::BTreeSet;

use staffguard_core::{AppResult, NonEmptyString};

use crate::{Permission, PriorityLevel, RoleCapabilities, RoleDraft, RoleSlug};

/// Scope a default template is installed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateScope {
    /// Installed once per tenant.
    Tenant,
    /// Installed once per vendor.
    Vendor,
}

/// Built-in system role definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultRoleTemplate {
    /// Role slug.
    pub name: &'static str,
    /// Display name.
    pub display_name: &'static str,
    /// Description.
    pub description: &'static str,
    /// Priority level.
    pub priority: i32,
    /// Capability flags.
    pub capabilities: RoleCapabilities,
    /// Granted permissions.
    pub permissions: &'static [Permission],
    /// Install scope.
    pub scope: TemplateScope,
}

impl DefaultRoleTemplate {
    /// Builds the validated role draft for this template.
    pub fn to_draft(&self) -> AppResult<RoleDraft> {
        Ok(RoleDraft {
            name: RoleSlug::new(self.name)?,
            display_name: NonEmptyString::new(self.display_name)?,
            description: Some(self.description.to_owned()),
            priority: PriorityLevel::new(self.priority)?,
            capabilities: self.capabilities,
            max_assignable_priority: None,
            permissions: self.permissions.iter().copied().collect::<BTreeSet<_>>(),
        })
    }
}

const STAFF_ADMIN: RoleCapabilities = RoleCapabilities {
    can_manage_staff: true,
    can_create_roles: true,
    can_delete_roles: false,
};

const STAFF_MANAGER: RoleCapabilities = RoleCapabilities {
    can_manage_staff: true,
    can_create_roles: false,
    can_delete_roles: false,
};

const EVERYTHING_BUT_SETTINGS: &[Permission] = &[
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
];

const MANAGER_PERMISSIONS: &[Permission] = &[
    Permission::StaffView,
    Permission::StaffCreate,
    Permission::StaffEdit,
    Permission::InvitationsManage,
    Permission::RolesView,
    Permission::RolesAssign,
    Permission::DepartmentsView,
    Permission::TeamsView,
    Permission::TeamsManage,
    Permission::DocumentsView,
];

const SPECIALIST_PERMISSIONS: &[Permission] = &[
    Permission::StaffView,
    Permission::DepartmentsView,
    Permission::TeamsView,
];

const SUPPORT_PERMISSIONS: &[Permission] = &[Permission::StaffView, Permission::DocumentsView];

const VIEWER_PERMISSIONS: &[Permission] = &[
    Permission::StaffView,
    Permission::RolesView,
    Permission::DepartmentsView,
    Permission::TeamsView,
    Permission::SettingsView,
];

/// Every built-in template, highest priority first within each scope.
pub const DEFAULT_ROLE_TEMPLATES: &[DefaultRoleTemplate] = &[
    DefaultRoleTemplate {
        name: "store_owner",
        display_name: "Store Owner",
        description: "Full control over the store and its staff",
        priority: 100,
        capabilities: RoleCapabilities::ALL,
        permissions: Permission::all(),
        scope: TemplateScope::Tenant,
    },
    DefaultRoleTemplate {
        name: "store_admin",
        display_name: "Store Admin",
        description: "Administers staff, roles and organization",
        priority: 90,
        capabilities: RoleCapabilities::ALL,
        permissions: EVERYTHING_BUT_SETTINGS,
        scope: TemplateScope::Tenant,
    },
    DefaultRoleTemplate {
        name: "store_manager",
        display_name: "Store Manager",
        description: "Manages day-to-day staff and teams",
        priority: 70,
        capabilities: STAFF_MANAGER,
        permissions: MANAGER_PERMISSIONS,
        scope: TemplateScope::Tenant,
    },
    DefaultRoleTemplate {
        name: "marketing_specialist",
        display_name: "Marketing Specialist",
        description: "Marketing operations",
        priority: 60,
        capabilities: RoleCapabilities::NONE,
        permissions: SPECIALIST_PERMISSIONS,
        scope: TemplateScope::Tenant,
    },
    DefaultRoleTemplate {
        name: "inventory_specialist",
        display_name: "Inventory Specialist",
        description: "Inventory operations",
        priority: 60,
        capabilities: RoleCapabilities::NONE,
        permissions: SPECIALIST_PERMISSIONS,
        scope: TemplateScope::Tenant,
    },
    DefaultRoleTemplate {
        name: "order_specialist",
        display_name: "Order Specialist",
        description: "Order fulfilment operations",
        priority: 60,
        capabilities: RoleCapabilities::NONE,
        permissions: SPECIALIST_PERMISSIONS,
        scope: TemplateScope::Tenant,
    },
    DefaultRoleTemplate {
        name: "customer_support",
        display_name: "Customer Support",
        description: "Customer support agents",
        priority: 50,
        capabilities: RoleCapabilities::NONE,
        permissions: SUPPORT_PERMISSIONS,
        scope: TemplateScope::Tenant,
    },
    DefaultRoleTemplate {
        name: "viewer",
        display_name: "Viewer",
        description: "Read-only access",
        priority: 10,
        capabilities: RoleCapabilities::NONE,
        permissions: VIEWER_PERMISSIONS,
        scope: TemplateScope::Tenant,
    },
    DefaultRoleTemplate {
        name: "vendor_owner",
        display_name: "Vendor Owner",
        description: "Full control over one vendor",
        priority: 80,
        capabilities: RoleCapabilities::ALL,
        permissions: EVERYTHING_BUT_SETTINGS,
        scope: TemplateScope::Vendor,
    },
    DefaultRoleTemplate {
        name: "vendor_admin",
        display_name: "Vendor Admin",
        description: "Administers vendor staff and roles",
        priority: 75,
        capabilities: STAFF_ADMIN,
        permissions: MANAGER_PERMISSIONS,
        scope: TemplateScope::Vendor,
    },
    DefaultRoleTemplate {
        name: "vendor_manager",
        display_name: "Vendor Manager",
        description: "Manages vendor staff",
        priority: 65,
        capabilities: STAFF_MANAGER,
        permissions: MANAGER_PERMISSIONS,
        scope: TemplateScope::Vendor,
    },
    DefaultRoleTemplate {
        name: "vendor_staff",
        display_name: "Vendor Staff",
        description: "Vendor team member",
        priority: 55,
        capabilities: RoleCapabilities::NONE,
        permissions: SPECIALIST_PERMISSIONS,
        scope: TemplateScope::Vendor,
    },
];

/// Returns the templates to install for a tenant or a vendor.
pub fn default_role_templates(
    scope: TemplateScope,
) -> impl Iterator<Item = &'static DefaultRoleTemplate> {
    DEFAULT_ROLE_TEMPLATES
        .iter()
        .filter(move |template| template.scope == scope)
}
