use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use staffguard_core::{AppError, AppResult};
use staffguard_domain::RoleSlug;

/// Claim asserted for platform owners alongside their realm roles.
pub const PLATFORM_OWNER_CLAIM: &str = "platform_owner";

/// Scope a mapped role is assigned in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimScope {
    /// Tenant-wide role, assigned without a vendor.
    Tenant,
    /// Vendor role, assigned only when a vendor context is present.
    Vendor,
}

/// One external claim mapped to an internal role slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimMapping {
    /// Claim string asserted by the identity provider.
    pub claim: String,
    /// Internal role slug.
    pub role: RoleSlug,
    /// Scope the role lives in.
    pub scope: ClaimScope,
    /// Expected priority of the mapped role.
    pub priority: i32,
}

/// Versioned external-claim to role mapping injected into claim sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimMappingTable {
    version: u32,
    entries: Vec<ClaimMapping>,
}

const BUILTIN_MAPPINGS: &[(&str, ClaimScope, i32)] = &[
    (PLATFORM_OWNER_CLAIM, ClaimScope::Tenant, 200),
    ("store_owner", ClaimScope::Tenant, 100),
    ("store_admin", ClaimScope::Tenant, 90),
    ("store_manager", ClaimScope::Tenant, 70),
    ("marketing_specialist", ClaimScope::Tenant, 60),
    ("inventory_specialist", ClaimScope::Tenant, 60),
    ("order_specialist", ClaimScope::Tenant, 60),
    ("customer_support", ClaimScope::Tenant, 50),
    ("viewer", ClaimScope::Tenant, 10),
    ("vendor_owner", ClaimScope::Vendor, 80),
    ("vendor_admin", ClaimScope::Vendor, 75),
    ("vendor_manager", ClaimScope::Vendor, 65),
    ("vendor_staff", ClaimScope::Vendor, 55),
];

impl ClaimMappingTable {
    /// Creates a table, rejecting claims mapped more than once.
    pub fn new(version: u32, entries: Vec<ClaimMapping>) -> AppResult<Self> {
        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.claim.as_str()) {
                return Err(AppError::Validation(format!(
                    "claim '{}' is mapped more than once",
                    entry.claim
                )));
            }
        }

        Ok(Self { version, entries })
    }

    /// Returns the built-in version 1 table, where every claim maps to the
    /// role slug of the same name.
    pub fn builtin() -> AppResult<Self> {
        let entries = BUILTIN_MAPPINGS
            .iter()
            .map(|(claim, scope, priority)| {
                Ok(ClaimMapping {
                    claim: (*claim).to_owned(),
                    role: RoleSlug::new(*claim)?,
                    scope: *scope,
                    priority: *priority,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Self::new(1, entries)
    }

    /// Parses a table from its JSON representation.
    pub fn from_json(payload: &str) -> AppResult<Self> {
        let table: Self = serde_json::from_str(payload).map_err(|error| {
            AppError::Validation(format!("invalid claim mapping table: {error}"))
        })?;

        Self::new(table.version, table.entries)
    }

    /// Returns the table version.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Returns all mappings.
    #[must_use]
    pub fn entries(&self) -> &[ClaimMapping] {
        &self.entries
    }

    /// Finds the mapping of one claim.
    #[must_use]
    pub fn lookup(&self, claim: &str) -> Option<&ClaimMapping> {
        self.entries.iter().find(|entry| entry.claim == claim)
    }

    /// Returns the highest mapped priority among the claims.
    #[must_use]
    pub fn highest_priority<'a>(
        &self,
        claims: impl IntoIterator<Item = &'a str>,
        is_platform_owner: bool,
    ) -> i32 {
        let platform = is_platform_owner.then_some(PLATFORM_OWNER_CLAIM);
        claims
            .into_iter()
            .chain(platform)
            .filter_map(|claim| self.lookup(claim))
            .map(|entry| entry.priority)
            .max()
            .unwrap_or(0)
    }
}
