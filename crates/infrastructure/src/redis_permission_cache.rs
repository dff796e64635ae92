//! Redis-backed permission cache shared across API instances.

use async_trait::async_trait;
use redis::AsyncCommands;

use praetoria_application::PermissionCache;
use praetoria_core::{AppError, AppResult, PrincipalId};
use praetoria_domain::Permission;

/// Redis implementation of the permission cache port.
///
/// Every instance reads and evicts through the same keyspace, so an
/// invalidation issued by one instance is immediately visible to all.
#[derive(Clone)]
pub struct RedisPermissionCache {
    client: redis::Client,
    key_prefix: String,
}

impl RedisPermissionCache {
    /// Creates a cache adapter with a configured Redis client and key prefix.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    fn key_for(&self, principal_id: PrincipalId) -> String {
        format!("{}:{principal_id}", self.key_prefix)
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Internal(format!("failed to connect to redis: {error}")))
    }
}

#[async_trait]
impl PermissionCache for RedisPermissionCache {
    async fn get(&self, principal_id: PrincipalId) -> AppResult<Option<Vec<Permission>>> {
        let mut connection = self.connection().await?;

        let encoded: Option<String> =
            connection.get(self.key_for(principal_id)).await.map_err(|error| {
                AppError::Internal(format!("failed to read permission cache entry: {error}"))
            })?;

        encoded
            .as_deref()
            .map(|value| {
                serde_json::from_str(value).map_err(|error| {
                    AppError::Internal(format!("invalid permission cache entry: {error}"))
                })
            })
            .transpose()
    }

    async fn put(&self, principal_id: PrincipalId, permissions: Vec<Permission>) -> AppResult<()> {
        let encoded = serde_json::to_string(&permissions).map_err(|error| {
            AppError::Internal(format!("failed to encode permission cache entry: {error}"))
        })?;

        let mut connection = self.connection().await?;
        connection
            .set(self.key_for(principal_id), encoded)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to write permission cache entry: {error}"))
            })
    }

    async fn evict(&self, principal_id: PrincipalId) -> AppResult<()> {
        let mut connection = self.connection().await?;
        connection
            .del(self.key_for(principal_id))
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to evict permission cache entry: {error}"))
            })
    }

    async fn clear(&self) -> AppResult<()> {
        let mut connection = self.connection().await?;
        let pattern = format!("{}:*", self.key_prefix);

        let keys: Vec<String> = connection.keys(pattern).await.map_err(|error| {
            AppError::Internal(format!("failed to enumerate permission cache keys: {error}"))
        })?;
        if keys.is_empty() {
            return Ok(());
        }

        connection.del(keys).await.map_err(|error| {
            AppError::Internal(format!("failed to clear permission cache: {error}"))
        })
    }
}
