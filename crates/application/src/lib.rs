//! Application services and ports for access control.

#![forbid(unsafe_code)]

mod access_evaluator;
mod access_ports;
mod permission_store;
mod rate_limit_service;
mod role_registry;

pub use access_evaluator::{AccessEvaluator, AccessGrant, AccessRequest, Decision, DenialReason};
pub use access_ports::{
    AuditEvent, AuditRepository, CreateRoleInput, PermissionCache, PermissionGroup,
    RoleAssignment, RoleDefinition, RoleDirectoryRepository, RoleId, SubscriptionProvider,
    SubscriptionSnapshot, UpdateRoleInput,
};
pub use permission_store::PermissionStore;
pub use rate_limit_service::{AttemptInfo, RateLimitRepository, RateLimitRule, RateLimitService};
pub use role_registry::{ROLES_MANAGE_PERMISSION, RoleRegistry};
