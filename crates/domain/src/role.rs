use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use staffguard_core::{AppError, AppResult, Capability, NonEmptyString, TenantId, VendorId};

use crate::Permission;

staffguard_core::uuid_identifier!(
    /// Unique identifier for a role record.
    RoleId
);

/// Highest priority accepted for any role.
pub const MAX_PRIORITY_LEVEL: i32 = 1_000;

/// Authority ranking of a role; higher values are more powerful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct PriorityLevel(i32);

impl PriorityLevel {
    /// Authority of a principal without any active role.
    pub const NONE: Self = Self(0);

    /// Creates a validated priority level.
    pub fn new(value: i32) -> AppResult<Self> {
        if !(0..=MAX_PRIORITY_LEVEL).contains(&value) {
            return Err(AppError::Validation(format!(
                "priority level must be between 0 and {MAX_PRIORITY_LEVEL}, got {value}"
            )));
        }

        Ok(Self(value))
    }

    /// Returns the raw priority value.
    #[must_use]
    pub fn value(&self) -> i32 {
        self.0
    }
}

impl TryFrom<i32> for PriorityLevel {
    type Error = AppError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PriorityLevel> for i32 {
    fn from(value: PriorityLevel) -> Self {
        value.0
    }
}

impl std::fmt::Display for PriorityLevel {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Role name slug, unique within a tenant and vendor scope.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoleSlug(String);

impl RoleSlug {
    /// Creates a validated slug of lowercase ASCII letters, digits and underscores.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into().trim().to_owned();

        if !(2..=64).contains(&value.len()) {
            return Err(AppError::Validation(format!(
                "role name '{value}' must be between 2 and 64 characters"
            )));
        }

        if !value.chars().all(|character| {
            character.is_ascii_lowercase() || character.is_ascii_digit() || character == '_'
        }) {
            return Err(AppError::Validation(format!(
                "role name '{value}' may only contain lowercase letters, digits and underscores"
            )));
        }

        if !value.starts_with(|character: char| character.is_ascii_lowercase()) {
            return Err(AppError::Validation(format!(
                "role name '{value}' must start with a letter"
            )));
        }

        Ok(Self(value))
    }

    /// Returns the slug.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for RoleSlug {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RoleSlug> for String {
    fn from(value: RoleSlug) -> Self {
        value.0
    }
}

/// Capability flags granted by a role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleCapabilities {
    /// Allows managing other staff members' assignments.
    pub can_manage_staff: bool,
    /// Allows creating and updating roles.
    pub can_create_roles: bool,
    /// Allows deleting roles.
    pub can_delete_roles: bool,
}

impl RoleCapabilities {
    /// No capability flags.
    pub const NONE: Self = Self {
        can_manage_staff: false,
        can_create_roles: false,
        can_delete_roles: false,
    };

    /// Every capability flag.
    pub const ALL: Self = Self {
        can_manage_staff: true,
        can_create_roles: true,
        can_delete_roles: true,
    };

    /// Returns whether the flag for `capability` is set.
    #[must_use]
    pub fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::ManageStaff => self.can_manage_staff,
            Capability::CreateRoles => self.can_create_roles,
            Capability::DeleteRoles => self.can_delete_roles,
        }
    }

    /// Logical OR of both flag sets.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            can_manage_staff: self.can_manage_staff || other.can_manage_staff,
            can_create_roles: self.can_create_roles || other.can_create_roles,
            can_delete_roles: self.can_delete_roles || other.can_delete_roles,
        }
    }

    /// Returns flags set here but not in `baseline`.
    pub fn added_since(self, baseline: Self) -> impl Iterator<Item = Capability> {
        Capability::all()
            .iter()
            .copied()
            .filter(move |capability| self.has(*capability) && !baseline.has(*capability))
    }
}

/// Validated input used to create a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDraft {
    /// Unique slug in tenant and vendor scope.
    pub name: RoleSlug,
    /// Human-friendly name.
    pub display_name: NonEmptyString,
    /// Optional description.
    pub description: Option<String>,
    /// Authority ranking.
    pub priority: PriorityLevel,
    /// Capability flags.
    pub capabilities: RoleCapabilities,
    /// Optional cap on what holders may assign.
    pub max_assignable_priority: Option<PriorityLevel>,
    /// Granted catalog permissions.
    pub permissions: BTreeSet<Permission>,
}

/// Partial role update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleUpdate {
    /// New display name.
    pub display_name: Option<NonEmptyString>,
    /// New description; `Some(None)` clears it.
    pub description: Option<Option<String>>,
    /// New priority.
    pub priority: Option<PriorityLevel>,
    /// New capability flags.
    pub capabilities: Option<RoleCapabilities>,
    /// New assignable ceiling; `Some(None)` clears it.
    pub max_assignable_priority: Option<Option<PriorityLevel>>,
    /// Activates or deactivates the role.
    pub is_active: Option<bool>,
}

impl RoleUpdate {
    fn touches_protected_fields(&self) -> bool {
        self.priority.is_some()
            || self.capabilities.is_some()
            || self.max_assignable_priority.is_some()
            || self.is_active.is_some()
    }
}

/// Tenant-scoped role with priority, capabilities and permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Stable identifier.
    pub role_id: RoleId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Owning vendor, absent for tenant-wide roles.
    pub vendor_id: Option<VendorId>,
    /// Unique slug in tenant and vendor scope.
    pub name: RoleSlug,
    /// Human-friendly name.
    pub display_name: NonEmptyString,
    /// Optional description.
    pub description: Option<String>,
    /// Authority ranking.
    pub priority: PriorityLevel,
    /// Capability flags.
    pub capabilities: RoleCapabilities,
    /// Optional cap on what holders may assign.
    pub max_assignable_priority: Option<PriorityLevel>,
    /// Protected from deletion and from non-display edits.
    pub is_system: bool,
    /// Inactive roles contribute nothing to effective permissions.
    pub is_active: bool,
    /// Granted catalog permissions.
    pub permissions: BTreeSet<Permission>,
}

impl Role {
    /// Builds a new active role from a validated draft.
    #[must_use]
    pub fn from_draft(
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
        draft: RoleDraft,
        is_system: bool,
    ) -> Self {
        Self {
            role_id: RoleId::new(),
            tenant_id,
            vendor_id,
            name: draft.name,
            display_name: draft.display_name,
            description: draft.description,
            priority: draft.priority,
            capabilities: draft.capabilities,
            max_assignable_priority: draft.max_assignable_priority,
            is_system,
            is_active: true,
            permissions: draft.permissions,
        }
    }

    /// Returns the role with `update` applied.
    ///
    /// System roles accept display name and description changes only.
    pub fn apply_update(&self, update: RoleUpdate) -> AppResult<Self> {
        if self.is_system && update.touches_protected_fields() {
            return Err(AppError::Validation(format!(
                "system role '{}' only allows display name and description changes",
                self.name.as_str()
            )));
        }

        let mut updated = self.clone();
        if let Some(display_name) = update.display_name {
            updated.display_name = display_name;
        }
        if let Some(description) = update.description {
            updated.description = description;
        }
        if let Some(priority) = update.priority {
            updated.priority = priority;
        }
        if let Some(capabilities) = update.capabilities {
            updated.capabilities = capabilities;
        }
        if let Some(max_assignable_priority) = update.max_assignable_priority {
            updated.max_assignable_priority = max_assignable_priority;
        }
        if let Some(is_active) = update.is_active {
            updated.is_active = is_active;
        }

        Ok(updated)
    }

    /// Highest priority a holder of this role may assign, inclusive.
    #[must_use]
    pub fn assignable_limit(&self) -> i32 {
        let below_own = self.priority.value() - 1;
        match self.max_assignable_priority {
            Some(cap) => cap.value().min(below_own),
            None => below_own,
        }
    }
}
