use serde::{Deserialize, Serialize};

use crate::{StaffId, TenantId, VendorId};

/// Authenticated staff member acting on the authorization core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffPrincipal {
    staff_id: StaffId,
    subject: String,
    display_name: String,
    tenant_id: TenantId,
    vendor_id: Option<VendorId>,
}

impl StaffPrincipal {
    /// Creates a principal from authentication and tenancy data.
    #[must_use]
    pub fn new(
        staff_id: StaffId,
        subject: impl Into<String>,
        display_name: impl Into<String>,
        tenant_id: TenantId,
        vendor_id: Option<VendorId>,
    ) -> Self {
        Self {
            staff_id,
            subject: subject.into(),
            display_name: display_name.into(),
            tenant_id,
            vendor_id,
        }
    }

    /// Returns the staff record linked to the session.
    #[must_use]
    pub fn staff_id(&self) -> StaffId {
        self.staff_id
    }

    /// Returns the stable subject claim from the identity provider.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.subject.as_str()
    }

    /// Returns the display name for the current staff member.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns the tenant linked to the principal.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns the vendor context of the session, if any.
    #[must_use]
    pub fn vendor_id(&self) -> Option<VendorId> {
        self.vendor_id
    }
}
