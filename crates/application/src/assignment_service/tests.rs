use chrono::{Duration, Utc};
use staffguard_core::{AppError, DenialReason, StaffId, StaffPrincipal};
use staffguard_domain::{AuditAction, AuditSnapshot, Permission, Role, RoleCapabilities};

use super::{AssignRoleInput, AssignmentService};
use crate::test_support::Harness;

fn service(harness: &Harness) -> AssignmentService {
    AssignmentService::new(
        harness.permissions.clone(),
        harness.store.clone(),
        harness.store.clone(),
        harness.dispatcher.clone(),
    )
}

fn assign_input(staff_id: StaffId, role: &Role) -> AssignRoleInput {
    AssignRoleInput {
        staff_id,
        role_id: role.role_id,
        scope: None,
        expires_at: None,
        is_primary: false,
        notes: None,
    }
}

const MANAGER: RoleCapabilities = RoleCapabilities {
    can_manage_staff: true,
    can_create_roles: false,
    can_delete_roles: false,
};

async fn manager_harness() -> (Harness, Role, Role, StaffPrincipal) {
    let harness = Harness::new();
    let manager = harness
        .role(
            "manager",
            70,
            MANAGER,
            &[Permission::RolesAssign, Permission::StaffView, Permission::RolesView],
        )
        .await;
    let support = harness
        .role("support", 50, RoleCapabilities::NONE, &[Permission::StaffView])
        .await;
    let actor = harness.principal_with(&[&manager]).await;
    (harness, manager, support, actor)
}

#[tokio::test]
async fn assigns_lower_role_and_invalidates_target() {
    let (harness, _, support, actor) = manager_harness().await;
    let target = StaffId::new();
    harness.store.add_staff(harness.tenant_id, target).await;

    let result = service(&harness)
        .assign_role(&actor, assign_input(target, &support))
        .await;

    assert!(result.is_ok_and(|assignment| {
        assignment.staff_id == target && assignment.assigned_by == Some(actor.staff_id())
    }));
    assert_eq!(
        harness.cache.staff_invalidations.lock().await.as_slice(),
        &[(harness.tenant_id, None, target)]
    );
    let events = harness.audit_events().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, AuditAction::RoleAssigned);
    assert_eq!(events[0].target_staff_id, Some(target));
}

#[tokio::test]
async fn self_assignment_is_rejected_even_below_caller_priority() {
    let (harness, _, support, actor) = manager_harness().await;

    let result = service(&harness)
        .assign_role(&actor, assign_input(actor.staff_id(), &support))
        .await;

    assert!(matches!(
        result,
        Err(AppError::BoundaryDenied(DenialReason::SelfAssignment))
    ));
    assert_eq!(harness.store.active_assignment_count(actor.staff_id()).await, 1);
}

#[tokio::test]
async fn assigning_role_at_caller_priority_is_rejected() {
    let (harness, manager, _, actor) = manager_harness().await;
    let target = StaffId::new();
    harness.store.add_staff(harness.tenant_id, target).await;

    let result = service(&harness)
        .assign_role(&actor, assign_input(target, &manager))
        .await;

    assert_eq!(
        result.as_ref().err().map(AppError::code),
        Some("PRIORITY_BOUNDARY_EXCEEDED")
    );
    assert_eq!(harness.store.active_assignment_count(target).await, 0);
}

#[tokio::test]
async fn duplicate_assignment_is_rejected() {
    let (harness, _, support, actor) = manager_harness().await;
    let target = StaffId::new();
    harness.store.grant(harness.tenant_id, target, &support).await;

    let result = service(&harness)
        .assign_role(&actor, assign_input(target, &support))
        .await;

    assert_eq!(
        result.as_ref().err().map(AppError::code),
        Some("ROLE_ALREADY_ASSIGNED")
    );
    assert_eq!(harness.store.active_assignment_count(target).await, 1);
}

#[tokio::test]
async fn unknown_staff_and_past_expiry_are_rejected() {
    let (harness, _, support, actor) = manager_harness().await;
    let service = service(&harness);
    let known = StaffId::new();
    harness.store.add_staff(harness.tenant_id, known).await;

    let unknown = service
        .assign_role(&actor, assign_input(StaffId::new(), &support))
        .await;
    let mut expired = assign_input(known, &support);
    expired.expires_at = Some(Utc::now() - Duration::hours(1));
    let expired = service.assign_role(&actor, expired).await;

    assert!(matches!(unknown, Err(AppError::NotFound(_))));
    assert!(matches!(expired, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn inactive_role_cannot_be_assigned() {
    let (harness, _, support, actor) = manager_harness().await;
    let target = StaffId::new();
    harness.store.add_staff(harness.tenant_id, target).await;
    for role in harness.store.state.lock().await.roles.iter_mut() {
        if role.role_id == support.role_id {
            role.is_active = false;
        }
    }

    let result = service(&harness)
        .assign_role(&actor, assign_input(target, &support))
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn self_removal_of_last_role_is_rejected_and_count_unchanged() {
    let harness = Harness::new();
    let member = harness
        .role("member", 40, MANAGER, &[Permission::RolesAssign])
        .await;
    let actor = harness.principal_with(&[&member]).await;

    let result = service(&harness)
        .remove_role(&actor, actor.staff_id(), member.role_id)
        .await;

    assert!(matches!(
        result,
        Err(AppError::BoundaryDenied(DenialReason::LastRoleRemoval))
    ));
    assert_eq!(harness.store.active_assignment_count(actor.staff_id()).await, 1);
}

#[tokio::test]
async fn removal_of_lower_role_from_other_staff_succeeds() {
    let (harness, _, support, actor) = manager_harness().await;
    let target = StaffId::new();
    harness.store.grant(harness.tenant_id, target, &support).await;

    let result = service(&harness)
        .remove_role(&actor, target, support.role_id)
        .await;

    assert!(result.is_ok_and(|removed| !removed.is_active));
    assert_eq!(harness.store.active_assignment_count(target).await, 0);
    let events = harness.audit_events().await;
    assert_eq!(events[0].action, AuditAction::RoleRemoved);
}

#[tokio::test]
async fn removal_of_role_at_caller_priority_is_rejected() {
    let (harness, manager, _, actor) = manager_harness().await;
    let target = StaffId::new();
    harness.store.grant(harness.tenant_id, target, &manager).await;

    let result = service(&harness)
        .remove_role(&actor, target, manager.role_id)
        .await;

    assert_eq!(
        result.as_ref().err().map(AppError::code),
        Some("PRIORITY_BOUNDARY_EXCEEDED")
    );
    assert_eq!(harness.store.active_assignment_count(target).await, 1);
}

#[tokio::test]
async fn removing_missing_assignment_is_not_found() {
    let (harness, _, support, actor) = manager_harness().await;

    let result = service(&harness)
        .remove_role(&actor, StaffId::new(), support.role_id)
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn staff_may_reprioritize_own_primary_role() {
    let harness = Harness::new();
    let viewer = harness.role("viewer", 10, RoleCapabilities::NONE, &[]).await;
    let support = harness.role("support", 50, RoleCapabilities::NONE, &[]).await;
    let actor = harness.principal_with(&[&viewer, &support]).await;

    let result = service(&harness)
        .set_primary_role(&actor, actor.staff_id(), support.role_id)
        .await;

    assert!(result.is_ok_and(|assignment| assignment.is_primary));
    let primaries = harness
        .store
        .state
        .lock()
        .await
        .assignments
        .iter()
        .filter(|assignment| assignment.is_primary)
        .count();
    assert_eq!(primaries, 1);
    let events = harness.audit_events().await;
    assert_eq!(
        events[0].new_value,
        Some(AuditSnapshot::PrimaryRole(support.role_id))
    );
}

#[tokio::test]
async fn set_primary_for_other_staff_needs_authority() {
    let harness = Harness::new();
    let support = harness.role("support", 50, RoleCapabilities::NONE, &[]).await;
    let actor = harness.principal_with(&[&support]).await;
    let other = harness.principal_with(&[&support]).await;

    let result = service(&harness)
        .set_primary_role(&actor, other.staff_id(), support.role_id)
        .await;

    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn listing_other_staff_requires_staff_view() {
    let harness = Harness::new();
    let viewer = harness.role("viewer", 10, RoleCapabilities::NONE, &[]).await;
    let actor = harness.principal_with(&[&viewer]).await;
    let other = harness.principal_with(&[&viewer]).await;
    let service = service(&harness);

    let own = service.list_staff_roles(&actor, actor.staff_id()).await;
    let foreign = service.list_staff_roles(&actor, other.staff_id()).await;
    let foreign_permissions = service
        .effective_permissions(&actor, other.staff_id())
        .await;

    assert!(own.is_ok_and(|assignments| assignments.len() == 1));
    assert!(matches!(foreign, Err(AppError::Forbidden(_))));
    assert!(matches!(foreign_permissions, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn assignment_is_visible_in_next_permission_read() {
    let (harness, _, support, actor) = manager_harness().await;
    let target = StaffId::new();
    harness.store.add_staff(harness.tenant_id, target).await;
    let service = service(&harness);

    let before = service
        .effective_permissions(&actor, target)
        .await
        .map(|resolved| resolved.has_permission(Permission::StaffView));
    service
        .assign_role(&actor, assign_input(target, &support))
        .await
        .unwrap_or_else(|_| unreachable!());
    let after = service
        .effective_permissions(&actor, target)
        .await
        .map(|resolved| resolved.has_permission(Permission::StaffView));

    assert_eq!(before.ok(), Some(false));
    assert_eq!(after.ok(), Some(true));
}

#[tokio::test]
async fn lapsed_assignments_are_expired_invalidated_and_audited() {
    let (harness, _, support, _) = manager_harness().await;
    let target = StaffId::new();
    let granted = harness.store.grant(harness.tenant_id, target, &support).await;
    {
        let mut state = harness.store.state.lock().await;
        if let Some(assignment) = state
            .assignments
            .iter_mut()
            .find(|assignment| assignment.assignment_id == granted.assignment_id)
        {
            assignment.expires_at = Some(Utc::now() - Duration::minutes(1));
        }
    }

    let expired = service(&harness)
        .expire_lapsed_assignments(Utc::now())
        .await
        .unwrap_or_default();

    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].assignment_id, granted.assignment_id);
    assert_eq!(harness.store.active_assignment_count(target).await, 0);
    assert_eq!(
        harness.cache.staff_invalidations.lock().await.as_slice(),
        &[(harness.tenant_id, None, target)]
    );
    let events = harness.audit_events().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, AuditAction::AssignmentExpired);
    assert_eq!(events[0].performed_by, None);
    assert!(matches!(
        events[0].old_value,
        Some(AuditSnapshot::Assignment(_))
    ));
}
