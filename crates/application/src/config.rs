use std::time::Duration;

/// Tuning for the effective permission cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionCacheSettings {
    /// Lifetime of a cached snapshot in seconds. Zero disables storing.
    pub ttl_seconds: u32,
    /// Upper bound for dropping one staff member's entries.
    pub staff_invalidation_timeout: Duration,
    /// Upper bound for dropping a whole tenant's entries.
    pub tenant_invalidation_timeout: Duration,
    /// Namespace prepended to shared cache keys.
    pub key_prefix: String,
}

impl PermissionCacheSettings {
    /// Creates settings with the given ttl and default timeouts.
    #[must_use]
    pub fn with_ttl_seconds(ttl_seconds: u32) -> Self {
        Self {
            ttl_seconds,
            ..Self::default()
        }
    }
}

impl Default for PermissionCacheSettings {
    fn default() -> Self {
        Self {
            ttl_seconds: 300,
            staff_invalidation_timeout: Duration::from_millis(100),
            tenant_invalidation_timeout: Duration::from_millis(200),
            key_prefix: "perms".to_owned(),
        }
    }
}

/// Tuning for the asynchronous audit queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditDispatcherSettings {
    /// Events buffered before new ones are dropped.
    pub queue_capacity: usize,
}

impl Default for AuditDispatcherSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 1_024,
        }
    }
}
