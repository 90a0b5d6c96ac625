use staffguard_application::{AuditEvent, AuditLogQuery, AuditLogRepository, AuditRepository};
use staffguard_core::{StaffId, TenantId};
use staffguard_domain::{AuditAction, AuditEntityType, AuditSnapshot, RoleId};

use super::PostgresAuditLogRepository;
use crate::PostgresAuditRepository;
use crate::postgres_test_support::test_pool;

#[tokio::test]
async fn appended_events_are_listed_with_snapshots() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let writer = PostgresAuditRepository::new(pool.clone());
    let reader = PostgresAuditLogRepository::new(pool);
    let tenant_id = TenantId::new();
    let actor = StaffId::new();
    let target = StaffId::new();
    let role_id = RoleId::new();

    let appended = writer
        .append_event(
            AuditEvent::new(
                tenant_id,
                None,
                AuditAction::PrimaryRoleChanged,
                AuditEntityType::RoleAssignment,
                role_id.to_string(),
            )
            .performed_by(actor)
            .targeting(target)
            .with_new_value(AuditSnapshot::PrimaryRole(role_id)),
        )
        .await;
    assert!(appended.is_ok());

    let entries = reader
        .list_recent_entries(
            tenant_id,
            AuditLogQuery {
                limit: 10,
                ..AuditLogQuery::default()
            },
        )
        .await
        .unwrap_or_default();
    assert_eq!(entries.len(), 1);

    let entry = &entries[0];
    assert_eq!(entry.action, "primary_role_changed");
    assert_eq!(entry.entity_type, "role_assignment");
    assert_eq!(entry.performed_by, Some(actor));
    assert_eq!(entry.target_staff_id, Some(target));
    assert!(entry.old_value.is_none());
    assert_eq!(
        entry
            .new_value
            .as_ref()
            .and_then(|value| value["type"].as_str()),
        Some("primary_role")
    );
    assert!(entry.created_at.ends_with('Z'));
}

#[tokio::test]
async fn listing_filters_by_action_and_target_without_crossing_tenants() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let writer = PostgresAuditRepository::new(pool.clone());
    let reader = PostgresAuditLogRepository::new(pool);
    let tenant_id = TenantId::new();
    let other_tenant = TenantId::new();
    let target = StaffId::new();

    let events = [
        AuditEvent::new(
            tenant_id,
            None,
            AuditAction::RoleAssigned,
            AuditEntityType::RoleAssignment,
            "a1",
        )
        .targeting(target),
        AuditEvent::new(
            tenant_id,
            None,
            AuditAction::RoleAssigned,
            AuditEntityType::RoleAssignment,
            "a2",
        )
        .targeting(StaffId::new()),
        AuditEvent::new(
            tenant_id,
            None,
            AuditAction::RoleCreated,
            AuditEntityType::Role,
            "r1",
        ),
        AuditEvent::new(
            other_tenant,
            None,
            AuditAction::RoleAssigned,
            AuditEntityType::RoleAssignment,
            "a3",
        )
        .targeting(target),
    ];
    for event in events {
        assert!(writer.append_event(event).await.is_ok());
    }

    let assigned = reader
        .list_recent_entries(
            tenant_id,
            AuditLogQuery {
                limit: 50,
                action: Some(AuditAction::RoleAssigned),
                ..AuditLogQuery::default()
            },
        )
        .await
        .unwrap_or_default();
    assert_eq!(assigned.len(), 2);

    let for_target = reader
        .list_recent_entries(
            tenant_id,
            AuditLogQuery {
                limit: 50,
                target_staff_id: Some(target),
                ..AuditLogQuery::default()
            },
        )
        .await
        .unwrap_or_default();
    assert_eq!(for_target.len(), 1);
    assert_eq!(for_target[0].entity_id, "a1");

    let roles = reader
        .list_recent_entries(
            tenant_id,
            AuditLogQuery {
                limit: 50,
                entity_type: Some(AuditEntityType::Role),
                ..AuditLogQuery::default()
            },
        )
        .await
        .unwrap_or_default();
    assert_eq!(roles.len(), 1);
}
