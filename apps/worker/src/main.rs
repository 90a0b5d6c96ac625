//! StaffGuard background worker: expires lapsed role assignments.

#![forbid(unsafe_code)]

mod config;

use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use staffguard_application::{
    AssignmentService, AuditDispatcher, AuditDispatcherSettings, EffectivePermissionService,
    PermissionCache,
};
use staffguard_core::{AppError, AppResult};
use staffguard_infrastructure::{
    InMemoryPermissionCache, PostgresAuditRepository, PostgresRbacRepository,
    RedisPermissionCache,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::WorkerConfig;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = WorkerConfig::load()?;
    let pool = connect_pool(config.database_url.as_str()).await?;
    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    let cache = build_permission_cache(&config)?;
    let repository = Arc::new(PostgresRbacRepository::new(pool.clone()));
    let (dispatcher, drain) = AuditDispatcher::spawn(
        Arc::new(PostgresAuditRepository::new(pool)),
        AuditDispatcherSettings::default(),
    );
    let permissions =
        EffectivePermissionService::new(repository.clone(), cache, config.cache.clone());
    let assignments =
        AssignmentService::new(permissions, repository.clone(), repository, dispatcher);

    info!(
        worker_id = %config.worker_id,
        sweep_interval_ms = u64::try_from(config.sweep_interval.as_millis()).unwrap_or(u64::MAX),
        shared_cache = config.redis_url.is_some(),
        "staffguard-worker started"
    );

    let mut ticker = tokio::time::interval(config.sweep_interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => sweep(&assignments, &config).await,
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    info!(worker_id = %config.worker_id, "staffguard-worker stopping");
    drop(assignments);
    drain.finish().await;
    Ok(())
}

async fn sweep(assignments: &AssignmentService, config: &WorkerConfig) {
    match assignments.expire_lapsed_assignments(Utc::now()).await {
        Ok(expired) if expired.is_empty() => {}
        Ok(expired) => {
            info!(
                worker_id = %config.worker_id,
                expired_count = expired.len(),
                "expired lapsed role assignments"
            );
        }
        Err(error) => {
            warn!(
                worker_id = %config.worker_id,
                error = %error,
                "failed to expire lapsed role assignments"
            );
        }
    }
}

async fn connect_pool(database_url: &str) -> AppResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))
}

fn build_permission_cache(config: &WorkerConfig) -> AppResult<Arc<dyn PermissionCache>> {
    let Some(redis_url) = config.redis_url.as_deref() else {
        return Ok(Arc::new(InMemoryPermissionCache::new()));
    };

    let client = redis::Client::open(redis_url)
        .map_err(|error| AppError::Internal(format!("invalid REDIS_URL: {error}")))?;
    Ok(Arc::new(RedisPermissionCache::new(
        client,
        config.cache.key_prefix.clone(),
    )))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
