use std::collections::HashSet;
use std::sync::Arc;

use praetoria_core::{AppError, AppResult, PrincipalId};
use praetoria_domain::{Permission, PermissionAction};

use crate::access_ports::{PermissionCache, RoleDirectoryRepository, RoleId};

/// Resolves and caches a principal's effective permission set.
///
/// The effective set is the union of permissions across all held roles,
/// deduplicated by permission id. Cached entries stay valid until a write
/// path invalidates them; invalidation must run after the backing-store
/// write commits, never before.
#[derive(Clone)]
pub struct PermissionStore {
    repository: Arc<dyn RoleDirectoryRepository>,
    cache: Arc<dyn PermissionCache>,
}

impl PermissionStore {
    /// Creates a store from a role directory and an injected cache.
    #[must_use]
    pub fn new(
        repository: Arc<dyn RoleDirectoryRepository>,
        cache: Arc<dyn PermissionCache>,
    ) -> Self {
        Self { repository, cache }
    }

    /// Returns the principal's effective permissions, fetching through on a
    /// cache miss. An empty set is cached like any other result.
    pub async fn effective_permissions(
        &self,
        principal_id: PrincipalId,
    ) -> AppResult<Vec<Permission>> {
        if let Some(cached) = self.cache.get(principal_id).await? {
            return Ok(cached);
        }

        let assignments = self
            .repository
            .list_assignments_for_principal(principal_id)
            .await?;

        let permissions = if assignments.is_empty() {
            Vec::new()
        } else {
            let role_ids = assignments
                .iter()
                .map(|assignment| assignment.role_id)
                .collect::<Vec<_>>();
            deduplicate_by_id(
                self.repository
                    .list_permissions_for_roles(role_ids.as_slice())
                    .await?,
            )
        };

        self.cache.put(principal_id, permissions.clone()).await?;
        Ok(permissions)
    }

    /// Returns whether the principal holds a permission satisfying all
    /// given constraints.
    pub async fn has_permission(
        &self,
        principal_id: PrincipalId,
        permission_name: &str,
        scope: Option<&str>,
        action: Option<PermissionAction>,
    ) -> AppResult<bool> {
        let permissions = self.effective_permissions(principal_id).await?;

        Ok(permissions
            .iter()
            .any(|permission| permission.satisfies(permission_name, scope, action)))
    }

    /// Ensures the principal holds the named permission.
    pub async fn require_permission(
        &self,
        principal_id: PrincipalId,
        permission_name: &str,
    ) -> AppResult<()> {
        if self
            .has_permission(principal_id, permission_name, None, None)
            .await?
        {
            return Ok(());
        }

        Err(AppError::Forbidden(format!(
            "principal '{principal_id}' is missing permission '{permission_name}'"
        )))
    }

    /// Evicts one principal's cached permission set.
    pub async fn invalidate(&self, principal_id: PrincipalId) -> AppResult<()> {
        self.cache.evict(principal_id).await
    }

    /// Clears the entire permission cache.
    pub async fn invalidate_all(&self) -> AppResult<()> {
        self.cache.clear().await
    }

    /// Evicts every current holder of the given role.
    ///
    /// Called after a role mutation commits so holders never observe the
    /// stale grant set.
    pub async fn invalidate_role_holders(&self, role_id: RoleId) -> AppResult<()> {
        let holders = self.repository.list_principals_for_role(role_id).await?;
        for holder in holders {
            self.cache.evict(holder).await?;
        }

        Ok(())
    }
}

fn deduplicate_by_id(permissions: Vec<Permission>) -> Vec<Permission> {
    let mut seen = HashSet::new();
    permissions
        .into_iter()
        .filter(|permission| seen.insert(permission.id))
        .collect()
}
