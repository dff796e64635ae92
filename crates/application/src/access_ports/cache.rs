use async_trait::async_trait;
use praetoria_core::{AppResult, PrincipalId};
use praetoria_domain::Permission;

/// Cache port for effective permission sets.
///
/// Entries have no TTL; staleness is prevented solely by explicit
/// invalidation from the write paths. The adapter is chosen at the
/// composition root: process-local for single-instance deployments, shared
/// (Redis) when several instances must observe the same invalidations.
#[async_trait]
pub trait PermissionCache: Send + Sync {
    /// Returns the cached effective permission set, if present.
    async fn get(&self, principal_id: PrincipalId) -> AppResult<Option<Vec<Permission>>>;

    /// Stores the effective permission set for a principal.
    async fn put(&self, principal_id: PrincipalId, permissions: Vec<Permission>) -> AppResult<()>;

    /// Removes one principal's entry.
    async fn evict(&self, principal_id: PrincipalId) -> AppResult<()>;

    /// Removes every entry.
    async fn clear(&self) -> AppResult<()>;
}
