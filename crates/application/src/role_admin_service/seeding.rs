use super::*;

use staffguard_core::{AppError, TenantId, VendorId};
use staffguard_domain::{
    AuditAction, AuditEntityType, AuditSnapshot, Role, TemplateScope, default_role_templates,
};
use tracing::info;

use crate::AuditEvent;

/// Result of seeding default roles into a scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Roles created by this run.
    pub created: Vec<Role>,
    /// Template names that already existed.
    pub existing: Vec<RoleSlug>,
}

impl RoleAdminService {
    /// Creates the default system roles for a tenant, and the vendor set
    /// when a vendor is given. Templates whose name already exists are left
    /// untouched, so repeated runs are no-ops.
    pub async fn seed_default_roles(
        &self,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
    ) -> AppResult<SeedReport> {
        let mut targets: Vec<(Option<VendorId>, TemplateScope)> =
            vec![(None, TemplateScope::Tenant)];
        if let Some(vendor_id) = vendor_id {
            targets.push((Some(vendor_id), TemplateScope::Vendor));
        }

        let mut report = SeedReport::default();
        for (scope_vendor, template_scope) in targets {
            for template in default_role_templates(template_scope) {
                let draft = template.to_draft()?;
                let existing = self
                    .roles
                    .find_role_by_name(tenant_id, scope_vendor, &draft.name)
                    .await?;
                if existing.is_some_and(|role| role.vendor_id == scope_vendor) {
                    report.existing.push(draft.name);
                    continue;
                }

                let name = draft.name.clone();
                match self
                    .roles
                    .create_role(Role::from_draft(tenant_id, scope_vendor, draft, true))
                    .await
                {
                    Ok(role) => report.created.push(role),
                    Err(AppError::Conflict(_)) => report.existing.push(name),
                    Err(error) => return Err(error),
                }
            }
        }

        if !report.created.is_empty() {
            info!(
                tenant_id = %tenant_id,
                created = report.created.len(),
                "seeded default roles"
            );
            self.audit.emit(
                AuditEvent::new(
                    tenant_id,
                    vendor_id,
                    AuditAction::RolesSeeded,
                    AuditEntityType::Role,
                    tenant_id.to_string(),
                )
                .with_new_value(AuditSnapshot::SeededRoles(
                    report
                        .created
                        .iter()
                        .map(|role| role.name.as_str().to_owned())
                        .collect(),
                )),
            );
        }

        Ok(report)
    }
}
