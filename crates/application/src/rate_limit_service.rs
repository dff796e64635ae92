use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use praetoria_core::{AppError, AppResult};

/// One rate limit rule applied before authentication.
#[derive(Debug, Clone)]
pub struct RateLimitRule {
    /// Route category the rule covers (e.g. "access_read", "access_admin").
    pub category: String,
    /// Maximum attempts allowed inside one window.
    pub max_attempts: i32,
    /// Window duration in seconds.
    pub window_seconds: i64,
}

impl RateLimitRule {
    /// Creates a rule.
    #[must_use]
    pub fn new(category: impl Into<String>, max_attempts: i32, window_seconds: i64) -> Self {
        Self {
            category: category.into(),
            max_attempts,
            window_seconds,
        }
    }
}

/// Attempt counter state for one key's active window.
#[derive(Debug, Clone)]
pub struct AttemptInfo {
    /// Attempts in the current window, including this one.
    pub attempt_count: i32,
    /// Start of the current window.
    pub window_started_at: DateTime<Utc>,
}

/// Repository port for rate limit counters.
#[async_trait]
pub trait RateLimitRepository: Send + Sync {
    /// Records an attempt for the key, resetting the counter when the
    /// window has lapsed, and returns the updated count.
    async fn record_attempt(
        &self,
        key: &str,
        window_duration_seconds: i64,
    ) -> AppResult<AttemptInfo>;

    /// Removes entries whose window started before the cutoff.
    async fn cleanup_expired(&self, before: DateTime<Utc>) -> AppResult<u64>;
}

/// Fixed-window rate limiting keyed by `"{category}:{identifier}"`, where
/// the identifier is typically a client address.
#[derive(Clone)]
pub struct RateLimitService {
    repository: Arc<dyn RateLimitRepository>,
}

impl RateLimitService {
    /// Creates the service.
    #[must_use]
    pub fn new(repository: Arc<dyn RateLimitRepository>) -> Self {
        Self { repository }
    }

    /// Records one attempt and rejects it once the rule's budget is spent.
    pub async fn check_rate_limit(&self, rule: &RateLimitRule, key: &str) -> AppResult<()> {
        let composite_key = format!("{}:{key}", rule.category);
        let info = self
            .repository
            .record_attempt(&composite_key, rule.window_seconds)
            .await?;

        if info.attempt_count > rule.max_attempts {
            return Err(AppError::RateLimited(
                "too many requests, please try again later".to_owned(),
            ));
        }

        Ok(())
    }

    /// Removes stale counters. Intended for a periodic background task.
    pub async fn cleanup(&self) -> AppResult<u64> {
        let cutoff = Utc::now() - chrono::Duration::hours(24);
        self.repository.cleanup_expired(cutoff).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use praetoria_core::{AppError, AppResult};
    use tokio::sync::Mutex;

    use super::{AttemptInfo, RateLimitRepository, RateLimitRule, RateLimitService};

    #[derive(Default)]
    struct FakeRateLimitRepository {
        counters: Mutex<HashMap<String, i32>>,
    }

    #[async_trait]
    impl RateLimitRepository for FakeRateLimitRepository {
        async fn record_attempt(&self, key: &str, _: i64) -> AppResult<AttemptInfo> {
            let mut counters = self.counters.lock().await;
            let count = counters.entry(key.to_owned()).or_insert(0);
            *count += 1;
            Ok(AttemptInfo {
                attempt_count: *count,
                window_started_at: Utc::now(),
            })
        }

        async fn cleanup_expired(&self, _: DateTime<Utc>) -> AppResult<u64> {
            let mut counters = self.counters.lock().await;
            let removed = counters.len() as u64;
            counters.clear();
            Ok(removed)
        }
    }

    #[tokio::test]
    async fn attempts_within_budget_pass_then_overflow_is_rejected() {
        let repository = Arc::new(FakeRateLimitRepository::default());
        let service = RateLimitService::new(repository);
        let rule = RateLimitRule::new("access_read", 2, 60);

        assert!(service.check_rate_limit(&rule, "10.0.0.1").await.is_ok());
        assert!(service.check_rate_limit(&rule, "10.0.0.1").await.is_ok());

        let third = service.check_rate_limit(&rule, "10.0.0.1").await;
        assert!(matches!(third, Err(AppError::RateLimited(_))));
    }

    #[tokio::test]
    async fn keys_are_scoped_per_category() {
        let repository = Arc::new(FakeRateLimitRepository::default());
        let service = RateLimitService::new(repository);
        let read = RateLimitRule::new("access_read", 1, 60);
        let admin = RateLimitRule::new("access_admin", 1, 60);

        assert!(service.check_rate_limit(&read, "10.0.0.1").await.is_ok());
        assert!(service.check_rate_limit(&admin, "10.0.0.1").await.is_ok());
    }
}
