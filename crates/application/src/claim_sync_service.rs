//! Additive synchronisation of identity-provider role claims.
//!
//! Claims only ever add assignments. A role held locally but missing from
//! the claim set is left alone so an identity-provider outage cannot lock
//! staff out.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use chrono::Utc;
use staffguard_core::{AppResult, DenialReason, StaffId, TenantId, VendorId};
use staffguard_domain::{
    AuditAction, AuditEntityType, AuditSnapshot, NewAssignment, RoleAssignment, RoleSlug,
};
use tracing::{debug, info, warn};

use crate::{
    AssignmentLedger, AuditDispatcher, AuditEvent, ClaimMappingTable, ClaimScope,
    EffectivePermissionService, LockedAssignment, PLATFORM_OWNER_CLAIM, RoleRepository,
};

#[cfg(test)]
mod tests;

const SYNC_NOTE: &str = "synced from identity provider claims";

/// Claims asserted for one authenticated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimSyncRequest {
    /// Tenant of the session.
    pub tenant_id: TenantId,
    /// Vendor context of the session, if any.
    pub vendor_id: Option<VendorId>,
    /// Staff member the session belongs to.
    pub staff_id: StaffId,
    /// Realm role claims.
    pub claims: Vec<String>,
    /// Platform owner flag claim.
    pub is_platform_owner: bool,
}

/// Why a claim produced no assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimSkipReason {
    /// No mapping exists for the claim.
    Unmapped,
    /// The claim maps to a vendor role and the session has no vendor.
    NoVendorContext,
    /// The mapped role does not exist in the tenant.
    RoleMissing,
    /// The mapped role is deactivated.
    RoleInactive,
    /// The assignment was refused; carries the error code.
    Rejected(&'static str),
}

/// A claim that produced no assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedClaim {
    /// Claim string.
    pub claim: String,
    /// Reason it was skipped.
    pub reason: ClaimSkipReason,
}

/// Outcome of one claim sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimSyncReport {
    /// Assignments created by this sync.
    pub assigned: Vec<RoleAssignment>,
    /// Mapped roles the staff member already held.
    pub already_held: Vec<RoleSlug>,
    /// Claims that produced nothing.
    pub skipped: Vec<SkippedClaim>,
}

/// Trusted, system-initiated role sync from external claims.
#[derive(Clone)]
pub struct ClaimSyncService {
    permissions: EffectivePermissionService,
    roles: Arc<dyn RoleRepository>,
    ledger: Arc<dyn AssignmentLedger>,
    mapping: Arc<ClaimMappingTable>,
    audit: AuditDispatcher,
}

impl ClaimSyncService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        permissions: EffectivePermissionService,
        roles: Arc<dyn RoleRepository>,
        ledger: Arc<dyn AssignmentLedger>,
        mapping: Arc<ClaimMappingTable>,
        audit: AuditDispatcher,
    ) -> Self {
        Self {
            permissions,
            roles,
            ledger,
            mapping,
            audit,
        }
    }

    /// Assigns every mapped role the staff member does not hold yet.
    ///
    /// Priority and self-assignment rules do not apply; only duplicates are
    /// refused. Per-claim failures are logged and reported, never returned.
    pub async fn sync_claims(&self, request: ClaimSyncRequest) -> AppResult<ClaimSyncReport> {
        let ClaimSyncRequest {
            tenant_id,
            vendor_id,
            staff_id,
            claims,
            is_platform_owner,
        } = request;

        let mut claims: BTreeSet<String> = claims.into_iter().collect();
        if is_platform_owner {
            claims.insert(PLATFORM_OWNER_CLAIM.to_owned());
        }

        let held: HashSet<_> = self
            .ledger
            .list_staff_assignments(tenant_id, vendor_id, staff_id, Utc::now())
            .await?
            .into_iter()
            .map(|assignment| assignment.role_id)
            .collect();

        debug!(
            tenant_id = %tenant_id,
            staff_id = %staff_id,
            claims = claims.len(),
            mapping_version = self.mapping.version(),
            "starting claim sync"
        );

        let mut report = ClaimSyncReport::default();
        for claim in claims {
            let Some(mapping) = self.mapping.lookup(&claim) else {
                report.skip(claim, ClaimSkipReason::Unmapped);
                continue;
            };
            let role_vendor = match mapping.scope {
                ClaimScope::Tenant => None,
                ClaimScope::Vendor => match vendor_id {
                    Some(vendor_id) => Some(vendor_id),
                    None => {
                        debug!(claim = %claim, "skipping vendor claim without vendor context");
                        report.skip(claim, ClaimSkipReason::NoVendorContext);
                        continue;
                    }
                },
            };

            let role = match self
                .roles
                .find_role_by_name(tenant_id, role_vendor, &mapping.role)
                .await
            {
                Ok(Some(role)) => role,
                Ok(None) => {
                    warn!(
                        tenant_id = %tenant_id,
                        claim = %claim,
                        role = mapping.role.as_str(),
                        "claim maps to a role missing from the tenant"
                    );
                    report.skip(claim, ClaimSkipReason::RoleMissing);
                    continue;
                }
                Err(error) => {
                    warn!(
                        tenant_id = %tenant_id,
                        claim = %claim,
                        error = %error,
                        "role lookup failed"
                    );
                    report.skip(claim, ClaimSkipReason::Rejected(error.code()));
                    continue;
                }
            };
            if !role.is_active {
                report.skip(claim, ClaimSkipReason::RoleInactive);
                continue;
            }
            if held.contains(&role.role_id) {
                report.already_held.push(role.name);
                continue;
            }

            let guard = |locked: LockedAssignment<'_>| -> AppResult<()> {
                if locked.already_assigned {
                    return Err(DenialReason::DuplicateAssignment.into());
                }
                Ok(())
            };
            let assigned = self
                .ledger
                .assign(
                    tenant_id,
                    role_vendor,
                    NewAssignment {
                        staff_id,
                        role_id: role.role_id,
                        scope: None,
                        expires_at: None,
                        is_primary: false,
                        assigned_by: None,
                        notes: Some(SYNC_NOTE.to_owned()),
                    },
                    &guard,
                )
                .await;

            match assigned {
                Ok(assignment) => {
                    info!(
                        tenant_id = %tenant_id,
                        staff_id = %staff_id,
                        role = role.name.as_str(),
                        "role assigned from claims"
                    );
                    self.audit.emit(
                        AuditEvent::new(
                            tenant_id,
                            role_vendor,
                            AuditAction::RoleSyncedFromClaims,
                            AuditEntityType::RoleAssignment,
                            assignment.assignment_id.to_string(),
                        )
                        .targeting(staff_id)
                        .with_new_value(AuditSnapshot::Assignment(assignment.clone())),
                    );
                    report.assigned.push(assignment);
                }
                Err(error)
                    if matches!(
                        error.denial_reason(),
                        Some(DenialReason::DuplicateAssignment)
                    ) =>
                {
                    report.already_held.push(role.name);
                }
                Err(error) => {
                    warn!(
                        tenant_id = %tenant_id,
                        claim = %claim,
                        error = %error,
                        "failed to assign role from claims"
                    );
                    report.skip(claim, ClaimSkipReason::Rejected(error.code()));
                }
            }
        }

        if !report.assigned.is_empty() {
            self.permissions
                .invalidate_staff(tenant_id, None, staff_id)
                .await;
        }

        Ok(report)
    }
}

impl ClaimSyncReport {
    fn skip(&mut self, claim: String, reason: ClaimSkipReason) {
        self.skipped.push(SkippedClaim { claim, reason });
    }
}
