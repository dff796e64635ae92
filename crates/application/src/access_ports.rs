//! Ports and projections shared by the access-control services.

mod audit;
mod cache;
mod roles;
mod subscription;

pub use audit::{AuditEvent, AuditRepository};
pub use cache::PermissionCache;
pub use roles::{
    CreateRoleInput, PermissionGroup, RoleAssignment, RoleDefinition, RoleDirectoryRepository,
    RoleId, UpdateRoleInput,
};
pub use subscription::{SubscriptionProvider, SubscriptionSnapshot};
