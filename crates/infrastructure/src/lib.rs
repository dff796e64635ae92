//! Infrastructure adapters: PostgreSQL repositories and cache backends.

#![forbid(unsafe_code)]

mod in_memory_permission_cache;
mod postgres_audit_repository;
mod postgres_rate_limit_repository;
mod postgres_role_directory;
mod postgres_subscription_repository;
mod redis_permission_cache;

pub use in_memory_permission_cache::InMemoryPermissionCache;
pub use postgres_audit_repository::PostgresAuditRepository;
pub use postgres_rate_limit_repository::PostgresRateLimitRepository;
pub use postgres_role_directory::PostgresRoleDirectory;
pub use postgres_subscription_repository::PostgresSubscriptionRepository;
pub use redis_permission_cache::RedisPermissionCache;
