use async_trait::async_trait;
use chrono::{DateTime, Utc};
use praetoria_core::{AppResult, PrincipalId};
use praetoria_domain::{SubscriptionStatus, SubscriptionTier, UsageSnapshot};

/// Read-only subscription state owned by the billing collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionSnapshot {
    /// Current subscription tier.
    pub tier: SubscriptionTier,
    /// Current billing status.
    pub status: SubscriptionStatus,
    /// Trial expiry, if the subscription started with a trial.
    pub trial_ends_at: Option<DateTime<Utc>>,
}

/// Port to the billing collaborator. Never mutated by this service.
#[async_trait]
pub trait SubscriptionProvider: Send + Sync {
    /// Returns the principal's subscription, if one exists.
    async fn find_subscription(
        &self,
        principal_id: PrincipalId,
    ) -> AppResult<Option<SubscriptionSnapshot>>;

    /// Returns fresh usage counters for the principal.
    async fn current_usage(&self, principal_id: PrincipalId) -> AppResult<UsageSnapshot>;
}
