//! PostgreSQL read-only adapter over billing-owned subscription tables.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use praetoria_application::{SubscriptionProvider, SubscriptionSnapshot};
use praetoria_core::{AppError, AppResult, PrincipalId};
use praetoria_domain::{SubscriptionStatus, SubscriptionTier, UsageSnapshot};

/// PostgreSQL implementation of the subscription provider port.
///
/// The tables are written by the billing service; this adapter only reads.
#[derive(Clone)]
pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct SubscriptionRow {
    tier: String,
    status: String,
    trial_ends_at: Option<DateTime<Utc>>,
}

#[derive(Debug, FromRow)]
struct UsageRow {
    storage_used_bytes: i64,
    queries_used: i64,
    users_count: i64,
}

#[async_trait]
impl SubscriptionProvider for PostgresSubscriptionRepository {
    async fn find_subscription(
        &self,
        principal_id: PrincipalId,
    ) -> AppResult<Option<SubscriptionSnapshot>> {
        let row = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT tier, status, trial_ends_at
            FROM subscriptions
            WHERE principal_id = $1
            "#,
        )
        .bind(principal_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load subscription: {error}")))?;

        row.map(map_subscription_row).transpose()
    }

    async fn current_usage(&self, principal_id: PrincipalId) -> AppResult<UsageSnapshot> {
        let row = sqlx::query_as::<_, UsageRow>(
            r#"
            SELECT storage_used_bytes, queries_used, users_count
            FROM subscription_usage
            WHERE principal_id = $1
            "#,
        )
        .bind(principal_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load usage: {error}")))?;

        // A principal with no usage row simply has not consumed anything yet.
        Ok(row
            .map(|row| UsageSnapshot {
                storage_used_bytes: row.storage_used_bytes,
                queries_used: row.queries_used,
                users_count: row.users_count,
            })
            .unwrap_or(UsageSnapshot {
                storage_used_bytes: 0,
                queries_used: 0,
                users_count: 0,
            }))
    }
}

fn map_subscription_row(row: SubscriptionRow) -> AppResult<SubscriptionSnapshot> {
    let tier = SubscriptionTier::from_str(row.tier.as_str())
        .map_err(|_| AppError::Internal(format!("unknown subscription tier '{}'", row.tier)))?;
    let status = SubscriptionStatus::from_str(row.status.as_str()).map_err(|_| {
        AppError::Internal(format!("unknown subscription status '{}'", row.status))
    })?;

    Ok(SubscriptionSnapshot {
        tier,
        status,
        trial_ends_at: row.trial_ends_at,
    })
}
