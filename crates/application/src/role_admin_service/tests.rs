use std::sync::Arc;

use staffguard_core::{AppError, DenialReason, VendorId};
use staffguard_domain::{
    AuditAction, Permission, PermissionId, PriorityLevel, RoleCapabilities, TemplateScope,
    default_role_templates,
};

use super::{CreateRoleInput, RoleAdminService, UpdateRoleInput};
use crate::RoleDeletion;
use crate::test_support::{FakeAuditLogRepository, Harness};

fn service(harness: &Harness) -> RoleAdminService {
    RoleAdminService::new(
        harness.permissions.clone(),
        harness.store.clone(),
        Arc::new(FakeAuditLogRepository),
        harness.dispatcher.clone(),
    )
}

fn create_input(name: &str, priority: i32) -> CreateRoleInput {
    CreateRoleInput {
        name: name.to_owned(),
        display_name: name.to_owned(),
        description: None,
        priority,
        capabilities: RoleCapabilities::NONE,
        max_assignable_priority: None,
        permission_ids: Vec::new(),
    }
}

const ROLE_CREATOR: RoleCapabilities = RoleCapabilities {
    can_manage_staff: false,
    can_create_roles: true,
    can_delete_roles: false,
};

#[tokio::test]
async fn create_role_is_strictly_below_caller_priority() {
    let harness = Harness::new();
    let creator = harness
        .role("creator", 50, ROLE_CREATOR, &[Permission::RolesManage])
        .await;
    let actor = harness.principal_with(&[&creator]).await;
    let service = service(&harness);

    let equal = service.create_role(&actor, create_input("peer", 50)).await;
    let below = service.create_role(&actor, create_input("junior", 49)).await;

    assert!(matches!(
        equal,
        Err(AppError::BoundaryDenied(DenialReason::PriorityEscalation {
            requested: 50,
            ceiling: 50
        }))
    ));
    assert!(below.is_ok_and(|role| role.priority.value() == 49 && !role.is_system));
}

#[tokio::test]
async fn create_role_requires_manage_permission() {
    let harness = Harness::new();
    let creator = harness.role("creator", 50, ROLE_CREATOR, &[]).await;
    let actor = harness.principal_with(&[&creator]).await;

    let result = service(&harness)
        .create_role(&actor, create_input("junior", 10))
        .await;

    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn create_role_cannot_grant_missing_capability() {
    let harness = Harness::new();
    let creator = harness
        .role("creator", 50, ROLE_CREATOR, &[Permission::RolesManage])
        .await;
    let actor = harness.principal_with(&[&creator]).await;
    let mut input = create_input("staffer", 10);
    input.capabilities.can_manage_staff = true;

    let result = service(&harness).create_role(&actor, input).await;

    assert_eq!(
        result.as_ref().err().map(AppError::code),
        Some("CANNOT_GRANT_MANAGE_STAFF")
    );
}

#[tokio::test]
async fn create_role_cannot_grant_permission_caller_lacks() {
    let harness = Harness::new();
    let creator = harness
        .role("creator", 50, ROLE_CREATOR, &[Permission::RolesManage])
        .await;
    let actor = harness.principal_with(&[&creator]).await;
    let mut input = create_input("auditor", 10);
    input.permission_ids = vec![Permission::AuditView.id()];

    let result = service(&harness).create_role(&actor, input).await;

    assert_eq!(
        result.as_ref().err().map(AppError::code),
        Some("PERMISSION_ESCALATION_DENIED")
    );
}

#[tokio::test]
async fn unknown_permission_id_is_validation_error() {
    let harness = Harness::new();
    let creator = harness
        .role("creator", 50, ROLE_CREATOR, &[Permission::RolesManage])
        .await;
    let actor = harness.principal_with(&[&creator]).await;
    let mut input = create_input("auditor", 10);
    input.permission_ids = vec![PermissionId::new()];

    let result = service(&harness).create_role(&actor, input).await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn update_cannot_touch_role_at_caller_level_even_to_lower_it() {
    let harness = Harness::new();
    let creator = harness
        .role("creator", 50, ROLE_CREATOR, &[Permission::RolesManage])
        .await;
    let peer = harness.role("peer", 50, RoleCapabilities::NONE, &[]).await;
    let actor = harness.principal_with(&[&creator]).await;

    let result = service(&harness)
        .update_role(
            &actor,
            peer.role_id,
            UpdateRoleInput {
                priority: Some(10),
                ..UpdateRoleInput::default()
            },
        )
        .await;

    assert!(matches!(
        result,
        Err(AppError::BoundaryDenied(
            DenialReason::PriorityBoundaryExceeded { .. }
        ))
    ));
    let stored = harness.store.state.lock().await.roles.clone();
    assert!(
        stored
            .iter()
            .any(|role| role.role_id == peer.role_id && role.priority.value() == 50)
    );
}

#[tokio::test]
async fn update_invalidates_tenant_cache_and_audits() {
    let harness = Harness::new();
    let creator = harness
        .role("creator", 50, ROLE_CREATOR, &[Permission::RolesManage])
        .await;
    let junior = harness.role("junior", 20, RoleCapabilities::NONE, &[]).await;
    let actor = harness.principal_with(&[&creator]).await;

    let result = service(&harness)
        .update_role(
            &actor,
            junior.role_id,
            UpdateRoleInput {
                display_name: Some("Junior Staff".to_owned()),
                priority: Some(30),
                ..UpdateRoleInput::default()
            },
        )
        .await;

    assert!(result.is_ok_and(|role| role.priority.value() == 30));
    assert_eq!(
        harness.cache.tenant_invalidations.lock().await.as_slice(),
        &[harness.tenant_id]
    );
    let events = harness.audit_events().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, AuditAction::RoleUpdated);
    assert!(events[0].old_value.is_some() && events[0].new_value.is_some());
}

#[tokio::test]
async fn system_role_update_only_changes_labels() {
    let harness = Harness::new();
    let creator = harness
        .role("creator", 50, ROLE_CREATOR, &[Permission::RolesManage])
        .await;
    let actor = harness.principal_with(&[&creator]).await;
    let service = service(&harness);
    let seeded = service.seed_default_roles(harness.tenant_id, None).await;
    let viewer = seeded
        .ok()
        .and_then(|report| {
            report
                .created
                .into_iter()
                .find(|role| role.name.as_str() == "viewer")
        })
        .unwrap_or_else(|| unreachable!());

    let relabel = service
        .update_role(
            &actor,
            viewer.role_id,
            UpdateRoleInput {
                display_name: Some("Read Only".to_owned()),
                ..UpdateRoleInput::default()
            },
        )
        .await;
    let reprioritize = service
        .update_role(
            &actor,
            viewer.role_id,
            UpdateRoleInput {
                priority: Some(5),
                ..UpdateRoleInput::default()
            },
        )
        .await;

    assert!(relabel.is_ok());
    assert!(matches!(reprioritize, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn delete_deactivates_referenced_role_and_removes_unreferenced_one() {
    let harness = Harness::new();
    let deleter = harness
        .role(
            "deleter",
            80,
            RoleCapabilities {
                can_delete_roles: true,
                ..RoleCapabilities::NONE
            },
            &[Permission::RolesManage],
        )
        .await;
    let held = harness.role("held", 20, RoleCapabilities::NONE, &[]).await;
    let unused = harness.role("unused", 20, RoleCapabilities::NONE, &[]).await;
    let actor = harness.principal_with(&[&deleter]).await;
    harness.principal_with(&[&held]).await;
    let service = service(&harness);

    let held_result = service.delete_role(&actor, held.role_id).await;
    let unused_result = service.delete_role(&actor, unused.role_id).await;

    assert!(matches!(held_result, Ok(RoleDeletion::Deactivated(_))));
    assert!(matches!(unused_result, Ok(RoleDeletion::Deleted(_))));
    let roles = harness.store.state.lock().await.roles.clone();
    assert!(
        roles
            .iter()
            .any(|role| role.role_id == held.role_id && !role.is_active)
    );
    assert!(roles.iter().all(|role| role.role_id != unused.role_id));
}

#[tokio::test]
async fn delete_refuses_system_roles() {
    let harness = Harness::new();
    let deleter = harness
        .role("deleter", 900, RoleCapabilities::ALL, &[Permission::RolesManage])
        .await;
    let actor = harness.principal_with(&[&deleter]).await;
    let service = service(&harness);
    let report = service
        .seed_default_roles(harness.tenant_id, None)
        .await
        .unwrap_or_default();
    let Some(viewer) = report.created.first() else {
        unreachable!();
    };

    let result = service.delete_role(&actor, viewer.role_id).await;

    assert_eq!(
        result.as_ref().err().map(AppError::code),
        Some("SYSTEM_ROLE_PROTECTED")
    );
}

#[tokio::test]
async fn set_permissions_replaces_whole_set() {
    let harness = Harness::new();
    let creator = harness
        .role(
            "creator",
            50,
            ROLE_CREATOR,
            &[Permission::RolesManage, Permission::StaffView, Permission::TeamsView],
        )
        .await;
    let junior = harness
        .role("junior", 20, RoleCapabilities::NONE, &[Permission::StaffView])
        .await;
    let actor = harness.principal_with(&[&creator]).await;

    let result = service(&harness)
        .set_role_permissions(&actor, junior.role_id, &[Permission::TeamsView.id()])
        .await;

    assert!(result.is_ok_and(|role| {
        role.permissions.len() == 1 && role.permissions.contains(&Permission::TeamsView)
    }));
    let events = harness.audit_events().await;
    assert_eq!(events[0].action, AuditAction::RolePermissionsChanged);
}

#[tokio::test]
async fn seeding_is_idempotent_and_adds_vendor_templates() {
    let harness = Harness::new();
    let service = service(&harness);
    let vendor_id = VendorId::new();

    let first = service
        .seed_default_roles(harness.tenant_id, None)
        .await
        .unwrap_or_default();
    let second = service
        .seed_default_roles(harness.tenant_id, None)
        .await
        .unwrap_or_default();
    let with_vendor = service
        .seed_default_roles(harness.tenant_id, Some(vendor_id))
        .await
        .unwrap_or_default();

    let tenant_templates = default_role_templates(TemplateScope::Tenant).count();
    let vendor_templates = default_role_templates(TemplateScope::Vendor).count();
    assert_eq!(first.created.len(), tenant_templates);
    assert!(first.created.iter().all(|role| role.is_system));
    assert!(second.created.is_empty());
    assert_eq!(second.existing.len(), tenant_templates);
    assert_eq!(with_vendor.created.len(), vendor_templates);
    assert!(
        with_vendor
            .created
            .iter()
            .all(|role| role.vendor_id == Some(vendor_id))
    );
}

#[tokio::test]
async fn assignable_roles_sit_below_caller_and_cap() {
    let harness = Harness::new();
    let mut manager = harness
        .role(
            "manager",
            70,
            RoleCapabilities {
                can_manage_staff: true,
                ..RoleCapabilities::NONE
            },
            &[Permission::RolesView],
        )
        .await;
    manager.max_assignable_priority = PriorityLevel::new(50).ok();
    harness.store.state.lock().await.roles[0] = manager.clone();
    harness.role("peer", 70, RoleCapabilities::NONE, &[]).await;
    harness.role("senior", 60, RoleCapabilities::NONE, &[]).await;
    harness.role("support", 50, RoleCapabilities::NONE, &[]).await;
    harness.role("viewer", 10, RoleCapabilities::NONE, &[]).await;
    let actor = harness.principal_with(&[&manager]).await;

    let roles = service(&harness)
        .list_assignable_roles(&actor)
        .await
        .unwrap_or_default();

    let names: Vec<&str> = roles.iter().map(|role| role.name.as_str()).collect();
    assert_eq!(names, vec!["support", "viewer"]);
}
