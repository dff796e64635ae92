use std::sync::Arc;

use chrono::Utc;
use praetoria_core::{AppError, AppResult, PrincipalId};
use praetoria_domain::{
    PermissionAction, ResourceCategory, SubscriptionStatus, SubscriptionTier, TierLimitSchedule,
    TierLimits, UNLIMITED, UsageSnapshot,
};

use crate::access_ports::SubscriptionProvider;
use crate::permission_store::PermissionStore;

/// One access question: "may this principal do this, here, now?"
///
/// Every gate is optional; an empty request checks only that a
/// subscription exists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessRequest {
    /// Permission the caller must hold, if any.
    pub permission: Option<String>,
    /// Scope the permission must carry, if constrained.
    pub scope: Option<String>,
    /// Action the permission must include, if constrained.
    pub action: Option<PermissionAction>,
    /// Minimum subscription tier, if the feature is tier-gated.
    pub required_tier: Option<SubscriptionTier>,
    /// Whether the subscription status must be `active`.
    pub require_active_subscription: bool,
    /// Whether a live trial satisfies the active-status gate.
    pub allow_trial: bool,
    /// Resource whose quota must have headroom, if consumption follows.
    pub resource: Option<ResourceCategory>,
}

/// Context returned with an allowed decision so handlers can act without
/// re-querying billing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGrant {
    /// Tier the decision was made under.
    pub tier: SubscriptionTier,
    /// Limits in force for that tier.
    pub limits: TierLimits,
    /// Usage counters, present only when a resource gate ran.
    pub usage: Option<UsageSnapshot>,
}

/// Why an access request was denied.
///
/// Denials are ordinary values, not errors; infrastructure failures
/// surface as [`AppError::Evaluation`] instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialReason {
    /// The principal does not hold the required permission.
    InsufficientPermission {
        /// Permission that was required.
        permission: String,
    },
    /// No subscription exists for the principal.
    NoSubscription,
    /// The subscription exists but is not in a usable state.
    SubscriptionInactive {
        /// Status observed at evaluation time.
        status: SubscriptionStatus,
    },
    /// The subscription tier is below the gate's minimum.
    InsufficientTier {
        /// Minimum tier the gate requires.
        required: SubscriptionTier,
        /// Tier the principal actually has.
        actual: SubscriptionTier,
    },
    /// The resource quota for the current tier is exhausted.
    LimitExceeded {
        /// Resource whose quota is exhausted.
        resource: ResourceCategory,
        /// Limit in force.
        limit: i64,
        /// Usage observed at evaluation time.
        used: i64,
    },
}

impl DenialReason {
    /// Stable machine-readable reason code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InsufficientPermission { .. } => "INSUFFICIENT_PERMISSION",
            Self::NoSubscription => "NO_SUBSCRIPTION",
            Self::SubscriptionInactive { .. } => "SUBSCRIPTION_INACTIVE",
            Self::InsufficientTier { .. } => "INSUFFICIENT_TIER",
            Self::LimitExceeded { resource, .. } => resource.limit_exceeded_code(),
        }
    }
}

/// Outcome of an access evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// All requested gates passed.
    Allowed(AccessGrant),
    /// A gate denied the request.
    Denied(DenialReason),
}

impl Decision {
    /// Returns whether the decision allows the request.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed(_))
    }
}

/// Evaluates access requests through fixed, ordered gates: permission,
/// subscription existence, subscription state, tier, usage.
///
/// The first failing gate produces the denial; later gates never run, so
/// a caller without the permission learns nothing about billing state.
#[derive(Clone)]
pub struct AccessEvaluator {
    permission_store: PermissionStore,
    subscriptions: Arc<dyn SubscriptionProvider>,
    schedule: TierLimitSchedule,
}

impl AccessEvaluator {
    /// Creates an evaluator from its collaborators and the limit schedule.
    #[must_use]
    pub fn new(
        permission_store: PermissionStore,
        subscriptions: Arc<dyn SubscriptionProvider>,
        schedule: TierLimitSchedule,
    ) -> Self {
        Self {
            permission_store,
            subscriptions,
            schedule,
        }
    }

    /// Evaluates one access request for a principal.
    ///
    /// Returns `Err(AppError::Evaluation)` when a backing dependency
    /// fails; a failed dependency never turns into a denial.
    pub async fn evaluate(
        &self,
        principal_id: PrincipalId,
        request: &AccessRequest,
    ) -> AppResult<Decision> {
        if let Some(permission) = request.permission.as_deref() {
            let held = self
                .permission_store
                .has_permission(
                    principal_id,
                    permission,
                    request.scope.as_deref(),
                    request.action,
                )
                .await
                .map_err(evaluation_failure)?;

            if !held {
                return Ok(Decision::Denied(DenialReason::InsufficientPermission {
                    permission: permission.to_owned(),
                }));
            }
        }

        let Some(subscription) = self
            .subscriptions
            .find_subscription(principal_id)
            .await
            .map_err(evaluation_failure)?
        else {
            return Ok(Decision::Denied(DenialReason::NoSubscription));
        };

        // A live trial satisfies the active-status gate regardless of the
        // underlying status.
        if request.require_active_subscription
            && subscription.status != SubscriptionStatus::Active
        {
            let trial_is_live = request.allow_trial
                && subscription
                    .trial_ends_at
                    .is_some_and(|ends_at| ends_at > Utc::now());
            if !trial_is_live {
                return Ok(Decision::Denied(DenialReason::SubscriptionInactive {
                    status: subscription.status,
                }));
            }
        }

        if let Some(required) = request.required_tier
            && subscription.tier < required
        {
            return Ok(Decision::Denied(DenialReason::InsufficientTier {
                required,
                actual: subscription.tier,
            }));
        }

        let limits = self.schedule.limits_for(subscription.tier);

        let mut usage = None;
        if let Some(resource) = request.resource {
            let snapshot = self
                .subscriptions
                .current_usage(principal_id)
                .await
                .map_err(evaluation_failure)?;
            let limit = limits.limit_for(resource);
            let used = snapshot.value_for(resource);

            if limit != UNLIMITED && used >= limit {
                return Ok(Decision::Denied(DenialReason::LimitExceeded {
                    resource,
                    limit,
                    used,
                }));
            }
            usage = Some(snapshot);
        }

        Ok(Decision::Allowed(AccessGrant {
            tier: subscription.tier,
            limits,
            usage,
        }))
    }
}

fn evaluation_failure(error: AppError) -> AppError {
    AppError::Evaluation(error.to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use praetoria_core::{AppError, AppResult, PrincipalId};
    use praetoria_domain::{
        Permission, PermissionAction, PermissionId, ResourceCategory, SubscriptionStatus,
        SubscriptionTier, TierLimitSchedule, UsageSnapshot,
    };
    use tokio::sync::Mutex;

    use crate::access_ports::{PermissionCache, SubscriptionProvider, SubscriptionSnapshot};
    use crate::permission_store::PermissionStore;
    use crate::permission_store::tests::FakeRoleDirectory;

    use super::{AccessEvaluator, AccessRequest, Decision, DenialReason};

    struct StaticCache {
        permissions: Vec<Permission>,
    }

    #[async_trait]
    impl PermissionCache for StaticCache {
        async fn get(&self, _: PrincipalId) -> AppResult<Option<Vec<Permission>>> {
            Ok(Some(self.permissions.clone()))
        }

        async fn put(&self, _: PrincipalId, _: Vec<Permission>) -> AppResult<()> {
            Ok(())
        }

        async fn evict(&self, _: PrincipalId) -> AppResult<()> {
            Ok(())
        }

        async fn clear(&self) -> AppResult<()> {
            Ok(())
        }
    }

    struct FakeBilling {
        subscription: Mutex<Option<SubscriptionSnapshot>>,
        usage: Mutex<UsageSnapshot>,
        fail_subscription: AtomicBool,
        subscription_calls: AtomicUsize,
    }

    impl FakeBilling {
        fn with(subscription: Option<SubscriptionSnapshot>, usage: UsageSnapshot) -> Self {
            Self {
                subscription: Mutex::new(subscription),
                usage: Mutex::new(usage),
                fail_subscription: AtomicBool::new(false),
                subscription_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SubscriptionProvider for FakeBilling {
        async fn find_subscription(
            &self,
            _: PrincipalId,
        ) -> AppResult<Option<SubscriptionSnapshot>> {
            self.subscription_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_subscription.load(Ordering::SeqCst) {
                return Err(AppError::Internal("billing store unreachable".to_owned()));
            }
            Ok(*self.subscription.lock().await)
        }

        async fn current_usage(&self, _: PrincipalId) -> AppResult<UsageSnapshot> {
            Ok(*self.usage.lock().await)
        }
    }

    fn grant(name: &str) -> Permission {
        Permission {
            id: PermissionId::new(),
            name: name.to_owned(),
            description: format!("{name} grant"),
            category: "Document Management".to_owned(),
            actions: [PermissionAction::Read].into_iter().collect(),
            scope: None,
        }
    }

    fn active(tier: SubscriptionTier) -> SubscriptionSnapshot {
        SubscriptionSnapshot {
            tier,
            status: SubscriptionStatus::Active,
            trial_ends_at: None,
        }
    }

    fn no_usage() -> UsageSnapshot {
        UsageSnapshot {
            storage_used_bytes: 0,
            queries_used: 0,
            users_count: 0,
        }
    }

    fn evaluator(
        permissions: Vec<Permission>,
        billing: Arc<FakeBilling>,
    ) -> AccessEvaluator {
        let store = PermissionStore::new(
            Arc::new(FakeRoleDirectory::default()),
            Arc::new(StaticCache { permissions }),
        );
        AccessEvaluator::new(store, billing, TierLimitSchedule::baseline())
    }

    fn denial(decision: AppResult<Decision>) -> DenialReason {
        match decision {
            Ok(Decision::Denied(reason)) => reason,
            other => panic!("expected denial, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_permission_denies_without_touching_billing() {
        let billing = Arc::new(FakeBilling::with(
            Some(active(SubscriptionTier::Consul)),
            no_usage(),
        ));
        let evaluator = evaluator(Vec::new(), billing.clone());

        let reason = denial(
            evaluator
                .evaluate(
                    PrincipalId::new(),
                    &AccessRequest {
                        permission: Some("document_read".to_owned()),
                        ..AccessRequest::default()
                    },
                )
                .await,
        );

        assert_eq!(reason.code(), "INSUFFICIENT_PERMISSION");
        assert_eq!(billing.subscription_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_subscription_denies_with_no_subscription() {
        let billing = Arc::new(FakeBilling::with(None, no_usage()));
        let evaluator = evaluator(vec![grant("document_read")], billing);

        let reason = denial(
            evaluator
                .evaluate(PrincipalId::new(), &AccessRequest::default())
                .await,
        );

        assert_eq!(reason, DenialReason::NoSubscription);
    }

    #[tokio::test]
    async fn live_trial_passes_the_active_status_gate() {
        // Status does not matter while the trial is live.
        let billing = Arc::new(FakeBilling::with(
            Some(SubscriptionSnapshot {
                tier: SubscriptionTier::Tribune,
                status: SubscriptionStatus::PastDue,
                trial_ends_at: Some(Utc::now() + Duration::days(1)),
            }),
            no_usage(),
        ));
        let evaluator = evaluator(Vec::new(), billing);

        let decision = evaluator
            .evaluate(
                PrincipalId::new(),
                &AccessRequest {
                    require_active_subscription: true,
                    allow_trial: true,
                    ..AccessRequest::default()
                },
            )
            .await;

        assert!(matches!(decision, Ok(Decision::Allowed(_))));
    }

    #[tokio::test]
    async fn expired_trial_denies_as_inactive() {
        let billing = Arc::new(FakeBilling::with(
            Some(SubscriptionSnapshot {
                tier: SubscriptionTier::Tribune,
                status: SubscriptionStatus::PastDue,
                trial_ends_at: Some(Utc::now() - Duration::hours(1)),
            }),
            no_usage(),
        ));
        let evaluator = evaluator(Vec::new(), billing);

        let reason = denial(
            evaluator
                .evaluate(
                    PrincipalId::new(),
                    &AccessRequest {
                        require_active_subscription: true,
                        allow_trial: true,
                        ..AccessRequest::default()
                    },
                )
                .await,
        );

        assert_eq!(reason.code(), "SUBSCRIPTION_INACTIVE");
    }

    #[tokio::test]
    async fn trial_denies_when_gate_disallows_trials() {
        let billing = Arc::new(FakeBilling::with(
            Some(SubscriptionSnapshot {
                tier: SubscriptionTier::Tribune,
                status: SubscriptionStatus::Trialing,
                trial_ends_at: Some(Utc::now() + Duration::days(3)),
            }),
            no_usage(),
        ));
        let evaluator = evaluator(Vec::new(), billing);

        let reason = denial(
            evaluator
                .evaluate(
                    PrincipalId::new(),
                    &AccessRequest {
                        require_active_subscription: true,
                        ..AccessRequest::default()
                    },
                )
                .await,
        );

        assert!(matches!(reason, DenialReason::SubscriptionInactive { .. }));
    }

    #[tokio::test]
    async fn inactive_status_passes_when_active_is_not_required() {
        let billing = Arc::new(FakeBilling::with(
            Some(SubscriptionSnapshot {
                tier: SubscriptionTier::Tribune,
                status: SubscriptionStatus::Canceled,
                trial_ends_at: None,
            }),
            no_usage(),
        ));
        let evaluator = evaluator(Vec::new(), billing);

        let decision = evaluator
            .evaluate(PrincipalId::new(), &AccessRequest::default())
            .await;

        assert!(matches!(decision, Ok(Decision::Allowed(_))));
    }

    #[tokio::test]
    async fn lower_tier_denies_with_both_tiers_reported() {
        let billing = Arc::new(FakeBilling::with(
            Some(active(SubscriptionTier::Centurion)),
            no_usage(),
        ));
        let evaluator = evaluator(Vec::new(), billing);

        let reason = denial(
            evaluator
                .evaluate(
                    PrincipalId::new(),
                    &AccessRequest {
                        required_tier: Some(SubscriptionTier::Tribune),
                        ..AccessRequest::default()
                    },
                )
                .await,
        );

        assert_eq!(
            reason,
            DenialReason::InsufficientTier {
                required: SubscriptionTier::Tribune,
                actual: SubscriptionTier::Centurion,
            }
        );
    }

    #[tokio::test]
    async fn higher_tier_passes_a_lower_gate() {
        let billing = Arc::new(FakeBilling::with(
            Some(active(SubscriptionTier::Consul)),
            no_usage(),
        ));
        let evaluator = evaluator(Vec::new(), billing);

        let decision = evaluator
            .evaluate(
                PrincipalId::new(),
                &AccessRequest {
                    required_tier: Some(SubscriptionTier::Tribune),
                    ..AccessRequest::default()
                },
            )
            .await;

        assert!(matches!(decision, Ok(Decision::Allowed(_))));
    }

    #[tokio::test]
    async fn usage_at_exact_limit_denies() {
        // Miles storage limit is exactly 5 GiB.
        let at_limit = UsageSnapshot {
            storage_used_bytes: 5 * 1024 * 1024 * 1024,
            queries_used: 0,
            users_count: 0,
        };
        let billing = Arc::new(FakeBilling::with(
            Some(active(SubscriptionTier::Miles)),
            at_limit,
        ));
        let evaluator = evaluator(Vec::new(), billing);

        let reason = denial(
            evaluator
                .evaluate(
                    PrincipalId::new(),
                    &AccessRequest {
                        resource: Some(ResourceCategory::Documents),
                        ..AccessRequest::default()
                    },
                )
                .await,
        );

        assert_eq!(reason.code(), "STORAGE_LIMIT_EXCEEDED");
    }

    #[tokio::test]
    async fn usage_below_limit_allows_and_reports_usage() {
        let below = UsageSnapshot {
            storage_used_bytes: 5 * 1024 * 1024 * 1024 - 1,
            queries_used: 0,
            users_count: 0,
        };
        let billing = Arc::new(FakeBilling::with(
            Some(active(SubscriptionTier::Miles)),
            below,
        ));
        let evaluator = evaluator(Vec::new(), billing);

        let decision = evaluator
            .evaluate(
                PrincipalId::new(),
                &AccessRequest {
                    resource: Some(ResourceCategory::Documents),
                    ..AccessRequest::default()
                },
            )
            .await;

        match decision {
            Ok(Decision::Allowed(access)) => assert_eq!(access.usage, Some(below)),
            other => panic!("expected allow, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unlimited_sentinel_never_denies() {
        let heavy = UsageSnapshot {
            storage_used_bytes: i64::MAX / 2,
            queries_used: i64::MAX / 2,
            users_count: i64::MAX / 2,
        };
        let billing = Arc::new(FakeBilling::with(
            Some(active(SubscriptionTier::Emperor)),
            heavy,
        ));
        let evaluator = evaluator(Vec::new(), billing);

        let decision = evaluator
            .evaluate(
                PrincipalId::new(),
                &AccessRequest {
                    resource: Some(ResourceCategory::AiQueries),
                    ..AccessRequest::default()
                },
            )
            .await;

        assert!(matches!(decision, Ok(Decision::Allowed(_))));
    }

    #[tokio::test]
    async fn billing_failure_surfaces_as_evaluation_error() {
        let billing = Arc::new(FakeBilling::with(
            Some(active(SubscriptionTier::Consul)),
            no_usage(),
        ));
        billing.fail_subscription.store(true, Ordering::SeqCst);
        let evaluator = evaluator(Vec::new(), billing);

        let decision = evaluator
            .evaluate(PrincipalId::new(), &AccessRequest::default())
            .await;

        assert!(matches!(decision, Err(AppError::Evaluation(_))));
    }

    #[tokio::test]
    async fn allowed_without_resource_gate_reports_no_usage() {
        let billing = Arc::new(FakeBilling::with(
            Some(active(SubscriptionTier::Tribune)),
            no_usage(),
        ));
        let evaluator = evaluator(vec![grant("document_read")], billing);

        let decision = evaluator
            .evaluate(
                PrincipalId::new(),
                &AccessRequest {
                    permission: Some("document_read".to_owned()),
                    ..AccessRequest::default()
                },
            )
            .await;

        match decision {
            Ok(Decision::Allowed(access)) => {
                assert_eq!(access.tier, SubscriptionTier::Tribune);
                assert_eq!(access.usage, None);
            }
            other => panic!("expected allow, got {other:?}"),
        }
    }
}
