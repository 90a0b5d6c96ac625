use std::sync::Arc;

use staffguard_core::{StaffId, VendorId};
use staffguard_domain::{AuditAction, Role, RoleCapabilities};

use super::{ClaimSkipReason, ClaimSyncRequest, ClaimSyncService};
use crate::ClaimMappingTable;
use crate::test_support::{Harness, draft};

fn service(harness: &Harness) -> ClaimSyncService {
    ClaimSyncService::new(
        harness.permissions.clone(),
        harness.store.clone(),
        harness.store.clone(),
        Arc::new(ClaimMappingTable::builtin().unwrap_or_else(|_| unreachable!())),
        harness.dispatcher.clone(),
    )
}

fn request(harness: &Harness, staff_id: StaffId, claims: &[&str]) -> ClaimSyncRequest {
    ClaimSyncRequest {
        tenant_id: harness.tenant_id,
        vendor_id: None,
        staff_id,
        claims: claims.iter().map(|claim| (*claim).to_owned()).collect(),
        is_platform_owner: false,
    }
}

#[tokio::test]
async fn sync_assigns_missing_roles_only() {
    let harness = Harness::new();
    let viewer = harness.role("viewer", 10, RoleCapabilities::NONE, &[]).await;
    let support = harness
        .role("customer_support", 50, RoleCapabilities::NONE, &[])
        .await;
    let staff = harness.principal_with(&[&viewer]).await;

    let report = service(&harness)
        .sync_claims(request(
            &harness,
            staff.staff_id(),
            &["viewer", "customer_support", "offline_access"],
        ))
        .await
        .unwrap_or_default();

    assert_eq!(report.assigned.len(), 1);
    assert_eq!(report.assigned[0].role_id, support.role_id);
    assert!(report.assigned[0].assigned_by.is_none());
    assert_eq!(
        report.already_held.iter().map(|name| name.as_str()).collect::<Vec<_>>(),
        vec!["viewer"]
    );
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].reason, ClaimSkipReason::Unmapped);
    assert_eq!(
        harness.cache.staff_invalidations.lock().await.as_slice(),
        &[(harness.tenant_id, None, staff.staff_id())]
    );
    let events = harness.audit_events().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, AuditAction::RoleSyncedFromClaims);
    assert!(events[0].performed_by.is_none());
}

#[tokio::test]
async fn sync_never_revokes_roles_missing_from_claims() {
    let harness = Harness::new();
    let manager = harness
        .role("store_manager", 70, RoleCapabilities::NONE, &[])
        .await;
    let staff = harness.principal_with(&[&manager]).await;

    let report = service(&harness)
        .sync_claims(request(&harness, staff.staff_id(), &[]))
        .await
        .unwrap_or_default();

    assert!(report.assigned.is_empty());
    assert_eq!(harness.store.active_assignment_count(staff.staff_id()).await, 1);
    assert!(harness.cache.staff_invalidations.lock().await.is_empty());
}

#[tokio::test]
async fn vendor_claims_need_vendor_context() {
    let harness = Harness::new();
    let vendor_id = VendorId::new();
    let vendor_staff = harness
        .store
        .add_role(Role::from_draft(
            harness.tenant_id,
            Some(vendor_id),
            draft("vendor_staff", 55, RoleCapabilities::NONE, &[]),
            true,
        ))
        .await;
    let staff_id = StaffId::new();
    let service = service(&harness);

    let without_vendor = service
        .sync_claims(request(&harness, staff_id, &["vendor_staff"]))
        .await
        .unwrap_or_default();
    let mut in_vendor = request(&harness, staff_id, &["vendor_staff"]);
    in_vendor.vendor_id = Some(vendor_id);
    let with_vendor = service.sync_claims(in_vendor).await.unwrap_or_default();

    assert_eq!(
        without_vendor.skipped[0].reason,
        ClaimSkipReason::NoVendorContext
    );
    assert_eq!(with_vendor.assigned.len(), 1);
    assert_eq!(with_vendor.assigned[0].role_id, vendor_staff.role_id);
    assert_eq!(with_vendor.assigned[0].vendor_id, Some(vendor_id));
}

#[tokio::test]
async fn platform_owner_flag_adds_claim_and_missing_role_is_skipped() {
    let harness = Harness::new();
    let mut sync = request(&harness, StaffId::new(), &[]);
    sync.is_platform_owner = true;

    let report = service(&harness)
        .sync_claims(sync)
        .await
        .unwrap_or_default();

    assert!(report.assigned.is_empty());
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].claim, "platform_owner");
    assert_eq!(report.skipped[0].reason, ClaimSkipReason::RoleMissing);
}

#[tokio::test]
async fn inactive_mapped_role_is_skipped() {
    let harness = Harness::new();
    let mut viewer = harness.role("viewer", 10, RoleCapabilities::NONE, &[]).await;
    viewer.is_active = false;
    harness.store.state.lock().await.roles[0] = viewer;

    let report = service(&harness)
        .sync_claims(request(&harness, StaffId::new(), &["viewer"]))
        .await
        .unwrap_or_default();

    assert_eq!(report.skipped[0].reason, ClaimSkipReason::RoleInactive);
}
