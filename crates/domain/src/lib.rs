//! Domain types for the Praetoria access-control service.

#![forbid(unsafe_code)]

mod audit;
mod permission;
mod subscription;

pub use audit::AuditAction;
pub use permission::{Permission, PermissionAction, PermissionId};
pub use subscription::{
    ResourceCategory, SubscriptionStatus, SubscriptionTier, TierLimitSchedule, TierLimits,
    UNLIMITED, UsageSnapshot,
};
