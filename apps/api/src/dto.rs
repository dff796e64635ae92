//! Transport types shared with the TypeScript frontend.

mod access;

pub use access::{
    AccessDecisionResponse, AssignRoleRequest, CreateRoleRequest, EvaluateAccessRequest,
    PermissionGroupResponse, PermissionResponse, RemoveRoleAssignmentRequest,
    RoleAssignmentResponse, RoleResponse, TierLimitsResponse, UpdateRoleRequest, UsageResponse,
};
