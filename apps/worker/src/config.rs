use std::env;
use std::time::Duration;

use staffguard_application::PermissionCacheSettings;
use staffguard_core::{AppError, AppResult};

/// Runtime settings read from the process environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WorkerConfig {
    pub(crate) database_url: String,
    pub(crate) redis_url: Option<String>,
    pub(crate) worker_id: String,
    pub(crate) sweep_interval: Duration,
    pub(crate) cache: PermissionCacheSettings,
}

impl WorkerConfig {
    pub(crate) fn load() -> AppResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| AppError::Validation("DATABASE_URL is required".to_owned()))?;
        let redis_url = non_empty(lookup("REDIS_URL"));
        let worker_id = non_empty(lookup("WORKER_ID"))
            .unwrap_or_else(|| format!("worker-{}", std::process::id()));
        let sweep_interval_ms = parse_or("ASSIGNMENT_SWEEP_INTERVAL_MS", &lookup, 60_000_u64)?;
        let defaults = PermissionCacheSettings::default();
        let ttl_seconds = parse_or(
            "PERMISSION_CACHE_TTL_SECONDS",
            &lookup,
            defaults.ttl_seconds,
        )?;
        let key_prefix =
            non_empty(lookup("PERMISSION_CACHE_KEY_PREFIX")).unwrap_or(defaults.key_prefix);

        if sweep_interval_ms == 0 {
            return Err(AppError::Validation(
                "ASSIGNMENT_SWEEP_INTERVAL_MS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            database_url,
            redis_url,
            worker_id,
            sweep_interval: Duration::from_millis(sweep_interval_ms),
            cache: PermissionCacheSettings {
                ttl_seconds,
                key_prefix,
                ..defaults
            },
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_or<T>(name: &str, lookup: &impl Fn(&str) -> Option<String>, default: T) -> AppResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(value) => value.trim().parse::<T>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        None => Ok(default),
    }
}
