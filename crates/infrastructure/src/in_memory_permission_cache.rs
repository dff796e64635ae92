//! Process-local permission cache for single-instance deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use praetoria_application::PermissionCache;
use praetoria_core::{AppResult, PrincipalId};
use praetoria_domain::Permission;

/// In-memory implementation of the permission cache port.
///
/// Entries live until explicitly evicted. Only suitable when a single
/// process serves all traffic; a fleet needs the shared Redis adapter so
/// every instance observes the same invalidations.
#[derive(Default)]
pub struct InMemoryPermissionCache {
    entries: RwLock<HashMap<PrincipalId, Vec<Permission>>>,
}

impl InMemoryPermissionCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PermissionCache for InMemoryPermissionCache {
    async fn get(&self, principal_id: PrincipalId) -> AppResult<Option<Vec<Permission>>> {
        Ok(self.entries.read().await.get(&principal_id).cloned())
    }

    async fn put(&self, principal_id: PrincipalId, permissions: Vec<Permission>) -> AppResult<()> {
        self.entries.write().await.insert(principal_id, permissions);
        Ok(())
    }

    async fn evict(&self, principal_id: PrincipalId) -> AppResult<()> {
        self.entries.write().await.remove(&principal_id);
        Ok(())
    }

    async fn clear(&self) -> AppResult<()> {
        self.entries.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use praetoria_application::PermissionCache;
    use praetoria_core::PrincipalId;
    use praetoria_domain::{Permission, PermissionAction, PermissionId};

    use super::InMemoryPermissionCache;

    fn permission(name: &str) -> Permission {
        Permission {
            id: PermissionId::new(),
            name: name.to_owned(),
            description: format!("{name} grant"),
            category: "Document Management".to_owned(),
            actions: BTreeSet::from([PermissionAction::Read]),
            scope: None,
        }
    }

    #[tokio::test]
    async fn put_get_evict_round_trip() {
        let cache = InMemoryPermissionCache::new();
        let principal_id = PrincipalId::new();
        let permissions = vec![permission("document_read")];

        assert_eq!(cache.get(principal_id).await.ok(), Some(None));

        let put = cache.put(principal_id, permissions.clone()).await;
        assert!(put.is_ok());
        assert_eq!(cache.get(principal_id).await.ok(), Some(Some(permissions)));

        let evicted = cache.evict(principal_id).await;
        assert!(evicted.is_ok());
        assert_eq!(cache.get(principal_id).await.ok(), Some(None));
    }

    #[tokio::test]
    async fn empty_sets_are_distinguishable_from_misses() {
        let cache = InMemoryPermissionCache::new();
        let principal_id = PrincipalId::new();

        let put = cache.put(principal_id, Vec::new()).await;
        assert!(put.is_ok());

        assert_eq!(cache.get(principal_id).await.ok(), Some(Some(Vec::new())));
    }

    #[tokio::test]
    async fn clear_removes_every_entry() {
        let cache = InMemoryPermissionCache::new();
        let first = PrincipalId::new();
        let second = PrincipalId::new();
        let _ = cache.put(first, vec![permission("document_read")]).await;
        let _ = cache.put(second, vec![permission("team_view")]).await;

        let cleared = cache.clear().await;
        assert!(cleared.is_ok());

        assert_eq!(cache.get(first).await.ok(), Some(None));
        assert_eq!(cache.get(second).await.ok(), Some(None));
    }
}
