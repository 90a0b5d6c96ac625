//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_permission_cache;
mod in_memory_rbac_repository;
mod postgres_audit_log_repository;
mod postgres_audit_repository;
mod postgres_rbac_repository;
mod redis_permission_cache;

#[cfg(test)]
mod postgres_test_support;

pub use in_memory_permission_cache::InMemoryPermissionCache;
pub use in_memory_rbac_repository::InMemoryRbacRepository;
pub use postgres_audit_log_repository::PostgresAuditLogRepository;
pub use postgres_audit_repository::PostgresAuditRepository;
pub use postgres_rbac_repository::PostgresRbacRepository;
pub use redis_permission_cache::RedisPermissionCache;
