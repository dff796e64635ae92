use std::collections::BTreeMap;
use std::str::FromStr;

use praetoria_core::AppError;
use serde::{Deserialize, Serialize};

/// Sentinel limit value meaning "no ceiling".
pub const UNLIMITED: i64 = -1;

const GIB: i64 = 1024 * 1024 * 1024;

/// Subscription tiers in ascending order of entitlement.
///
/// The declaration order defines the total order used for "at least tier X"
/// checks; `level` exposes the same order as an integer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    /// Entry tier.
    Miles,
    /// Small-team tier.
    Centurion,
    /// Mid-size tier.
    Tribune,
    /// Large-organization tier.
    Consul,
    /// Unmetered tier.
    Emperor,
}

impl SubscriptionTier {
    /// Returns the integer level backing the tier order.
    #[must_use]
    pub fn level(&self) -> u8 {
        match self {
            Self::Miles => 1,
            Self::Centurion => 2,
            Self::Tribune => 3,
            Self::Consul => 4,
            Self::Emperor => 5,
        }
    }

    /// Returns a stable storage value for this tier.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Miles => "miles",
            Self::Centurion => "centurion",
            Self::Tribune => "tribune",
            Self::Consul => "consul",
            Self::Emperor => "emperor",
        }
    }

    /// Returns all tiers in ascending order.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[SubscriptionTier] = &[
            SubscriptionTier::Miles,
            SubscriptionTier::Centurion,
            SubscriptionTier::Tribune,
            SubscriptionTier::Consul,
            SubscriptionTier::Emperor,
        ];

        ALL
    }
}

impl FromStr for SubscriptionTier {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "miles" => Ok(Self::Miles),
            "centurion" => Ok(Self::Centurion),
            "tribune" => Ok(Self::Tribune),
            "consul" => Ok(Self::Consul),
            "emperor" => Ok(Self::Emperor),
            _ => Err(AppError::Validation(format!(
                "unknown subscription tier '{value}'"
            ))),
        }
    }
}

/// Subscription lifecycle states mirrored from the billing processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Paid and current.
    Active,
    /// Inside a trial period.
    Trialing,
    /// Payment overdue.
    PastDue,
    /// Canceled by the customer.
    Canceled,
    /// Initial payment not yet completed.
    Incomplete,
    /// Initial payment window elapsed.
    IncompleteExpired,
    /// Payment collection abandoned.
    Unpaid,
}

impl SubscriptionStatus {
    /// Returns a stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Trialing => "trialing",
            Self::PastDue => "past_due",
            Self::Canceled => "canceled",
            Self::Incomplete => "incomplete",
            Self::IncompleteExpired => "incomplete_expired",
            Self::Unpaid => "unpaid",
        }
    }
}

impl FromStr for SubscriptionStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "active" => Ok(Self::Active),
            "trialing" => Ok(Self::Trialing),
            "past_due" => Ok(Self::PastDue),
            "canceled" => Ok(Self::Canceled),
            "incomplete" => Ok(Self::Incomplete),
            "incomplete_expired" => Ok(Self::IncompleteExpired),
            "unpaid" => Ok(Self::Unpaid),
            _ => Err(AppError::Validation(format!(
                "unknown subscription status '{value}'"
            ))),
        }
    }
}

/// Metered resource categories with per-tier ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceCategory {
    /// Document storage, measured in bytes.
    Documents,
    /// Monthly AI assistant queries.
    AiQueries,
    /// Concurrent seats.
    Users,
}

impl ResourceCategory {
    /// Returns a stable storage value for this category.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Documents => "documents",
            Self::AiQueries => "ai_queries",
            Self::Users => "users",
        }
    }

    /// Returns the denial code emitted when this category's limit is hit.
    #[must_use]
    pub fn limit_exceeded_code(&self) -> &'static str {
        match self {
            Self::Documents => "STORAGE_LIMIT_EXCEEDED",
            Self::AiQueries => "QUERY_LIMIT_EXCEEDED",
            Self::Users => "USER_LIMIT_EXCEEDED",
        }
    }
}

impl FromStr for ResourceCategory {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "documents" => Ok(Self::Documents),
            "ai_queries" => Ok(Self::AiQueries),
            "users" => Ok(Self::Users),
            _ => Err(AppError::Validation(format!(
                "unknown resource category '{value}'"
            ))),
        }
    }
}

/// Usage ceilings for one tier. `-1` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLimits {
    /// Document storage ceiling in bytes.
    pub storage_bytes: i64,
    /// Monthly AI query ceiling.
    pub monthly_ai_queries: i64,
    /// Concurrent seat ceiling.
    pub max_users: i64,
}

impl TierLimits {
    /// Returns the ceiling for one resource category.
    #[must_use]
    pub fn limit_for(&self, category: ResourceCategory) -> i64 {
        match category {
            ResourceCategory::Documents => self.storage_bytes,
            ResourceCategory::AiQueries => self.monthly_ai_queries,
            ResourceCategory::Users => self.max_users,
        }
    }
}

/// Usage counters read from the billing collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UsageSnapshot {
    /// Document storage currently used, in bytes.
    pub storage_used_bytes: i64,
    /// AI queries used in the current month.
    pub queries_used: i64,
    /// Seats currently active.
    pub users_count: i64,
}

impl UsageSnapshot {
    /// Returns the counter for one resource category.
    #[must_use]
    pub fn value_for(&self, category: ResourceCategory) -> i64 {
        match category {
            ResourceCategory::Documents => self.storage_used_bytes,
            ResourceCategory::AiQueries => self.queries_used,
            ResourceCategory::Users => self.users_count,
        }
    }
}

/// The single source of truth mapping every tier to its limits.
///
/// Constructed once at the composition root, either from the baseline table
/// or wholesale from configuration. Limits are never assembled from more
/// than one literal table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLimitSchedule(BTreeMap<SubscriptionTier, TierLimits>);

impl TierLimitSchedule {
    /// Returns the shipped baseline schedule.
    #[must_use]
    pub fn baseline() -> Self {
        let mut table = BTreeMap::new();
        table.insert(
            SubscriptionTier::Miles,
            TierLimits {
                storage_bytes: 5 * GIB,
                monthly_ai_queries: 100,
                max_users: 1,
            },
        );
        table.insert(
            SubscriptionTier::Centurion,
            TierLimits {
                storage_bytes: 20 * GIB,
                monthly_ai_queries: 250,
                max_users: 3,
            },
        );
        table.insert(
            SubscriptionTier::Tribune,
            TierLimits {
                storage_bytes: 30 * GIB,
                monthly_ai_queries: 500,
                max_users: 5,
            },
        );
        table.insert(
            SubscriptionTier::Consul,
            TierLimits {
                storage_bytes: 100 * GIB,
                monthly_ai_queries: UNLIMITED,
                max_users: UNLIMITED,
            },
        );
        table.insert(
            SubscriptionTier::Emperor,
            TierLimits {
                storage_bytes: UNLIMITED,
                monthly_ai_queries: UNLIMITED,
                max_users: UNLIMITED,
            },
        );

        Self(table)
    }

    /// Builds a schedule from an explicit per-tier table.
    ///
    /// Every tier must be present; partial tables are rejected so limits can
    /// never silently fall back to a second source.
    pub fn from_table(table: BTreeMap<SubscriptionTier, TierLimits>) -> Result<Self, AppError> {
        for tier in SubscriptionTier::all() {
            if !table.contains_key(tier) {
                return Err(AppError::Validation(format!(
                    "tier limit schedule is missing tier '{}'",
                    tier.as_str()
                )));
            }
        }

        Ok(Self(table))
    }

    /// Returns the limits for one tier.
    #[must_use]
    pub fn limits_for(&self, tier: SubscriptionTier) -> TierLimits {
        self.0.get(&tier).copied().unwrap_or(TierLimits {
            storage_bytes: 0,
            monthly_ai_queries: 0,
            max_users: 0,
        })
    }
}

impl Default for TierLimitSchedule {
    fn default() -> Self {
        Self::baseline()
    }
}
