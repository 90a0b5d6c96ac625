//! Shared primitives for all Rust crates in Staffguard.

#![forbid(unsafe_code)]

/// Authentication primitives shared across services.
pub mod auth;
/// Boundary denial vocabulary.
pub mod boundary;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use auth::StaffPrincipal;
pub use boundary::{Capability, DenialReason};

/// Defines a UUID-backed identifier newtype.
#[macro_export]
macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Creates a random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID value.
            #[must_use]
            pub fn from_uuid(value: uuid::Uuid) -> Self {
                Self(value)
            }

            /// Returns the underlying UUID value.
            #[must_use]
            pub fn as_uuid(&self) -> uuid::Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(formatter, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::AppError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                uuid::Uuid::parse_str(value.trim()).map(Self).map_err(|error| {
                    $crate::AppError::Validation(format!(
                        "invalid {} '{value}': {error}",
                        stringify!($name)
                    ))
                })
            }
        }
    };
}

/// Result type used across Staffguard crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value.trim().to_owned()))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for NonEmptyString {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

uuid_identifier!(
    /// Tenant identifier used as the partition key for every persisted resource.
    TenantId
);

uuid_identifier!(
    /// Vendor identifier narrowing a tenant scope to one marketplace vendor.
    VendorId
);

uuid_identifier!(
    /// Staff member identifier owned by the staff profile service.
    StaffId
);

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Principal is not authenticated.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Principal is authenticated but lacks a catalog permission.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Role mutation refused by the priority and capability boundary.
    #[error("boundary denied: {0}")]
    BoundaryDenied(#[from] DenialReason),

    /// Department reparenting would create a cycle.
    #[error("circular reference: {0}")]
    CycleDetected(String),

    /// Department still has active teams attached.
    #[error("department '{department_id}' has {team_count} active team(s)")]
    HasDependentTeams {
        /// Department that was targeted.
        department_id: String,
        /// Number of blocking teams.
        team_count: u64,
    },

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the stable error code surfaced to transport layers.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::BoundaryDenied(reason) => reason.code(),
            Self::CycleDetected(_) => "CIRCULAR_REFERENCE",
            Self::HasDependentTeams { .. } => "HAS_TEAMS",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the denial reason when this is a boundary rejection.
    #[must_use]
    pub fn denial_reason(&self) -> Option<&DenialReason> {
        match self {
            Self::BoundaryDenied(reason) => Some(reason),
            _ => None,
        }
    }
}
