//! Database bootstrap shared by PostgreSQL adapter tests.
//!
//! Tests return early when `DATABASE_URL` is unset.

use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;

use staffguard_core::{StaffId, TenantId};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub(crate) async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(4)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for postgres adapter tests: {error}");
    }

    Some(pool)
}

pub(crate) async fn ensure_staff(pool: &PgPool, tenant_id: TenantId, staff_id: StaffId) {
    let insert = sqlx::query(
        r#"
        INSERT INTO staff_members (id, tenant_id, display_name)
        VALUES ($1, $2, 'Test Staff')
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(staff_id.as_uuid())
    .bind(tenant_id.as_uuid())
    .execute(pool)
    .await;

    assert!(insert.is_ok());
}
