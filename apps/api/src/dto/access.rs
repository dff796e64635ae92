use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use praetoria_application::{
    AccessGrant, Decision, PermissionGroup, RoleAssignment, RoleDefinition,
};
use praetoria_domain::{Permission, TierLimits, UsageSnapshot};

/// Incoming payload for custom role creation.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/create-role-request.ts"
)]
pub struct CreateRoleRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub permission_ids: Vec<Uuid>,
}

/// Incoming payload for role updates.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/update-role-request.ts"
)]
pub struct UpdateRoleRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub permission_ids: Option<Vec<Uuid>>,
}

/// Incoming payload for role assignment.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/assign-role-request.ts"
)]
pub struct AssignRoleRequest {
    pub principal_id: Uuid,
    pub role_id: Uuid,
}

/// Incoming payload for role unassignment.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/remove-role-assignment-request.ts"
)]
pub struct RemoveRoleAssignmentRequest {
    pub principal_id: Uuid,
    pub role_id: Uuid,
}

/// Incoming payload for an access evaluation.
///
/// Enumerated fields arrive as their wire names (`"tribune"`,
/// `"ai_queries"`, `"read"`) and are parsed by the handler.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/evaluate-access-request.ts"
)]
pub struct EvaluateAccessRequest {
    pub permission: Option<String>,
    pub scope: Option<String>,
    pub action: Option<String>,
    pub required_tier: Option<String>,
    #[serde(default)]
    pub require_active_subscription: bool,
    #[serde(default)]
    pub allow_trial: bool,
    pub resource: Option<String>,
}

/// API representation of a permission grant.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/permission-response.ts"
)]
pub struct PermissionResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub actions: Vec<String>,
    pub scope: Option<String>,
}

/// API representation of a permission catalog category.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/permission-group-response.ts"
)]
pub struct PermissionGroupResponse {
    pub category: String,
    pub permissions: Vec<PermissionResponse>,
}

/// API representation of a role.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/role-response.ts"
)]
pub struct RoleResponse {
    pub role_id: String,
    pub name: String,
    pub description: String,
    pub is_custom: bool,
    pub member_count: u64,
    pub permissions: Vec<PermissionResponse>,
}

/// API representation of a role assignment.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/role-assignment-response.ts"
)]
pub struct RoleAssignmentResponse {
    pub principal_id: String,
    pub role_id: String,
    pub assigned_by: String,
    pub assigned_at: String,
}

/// API representation of tier limits.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/tier-limits-response.ts"
)]
pub struct TierLimitsResponse {
    pub storage_bytes: i64,
    pub monthly_ai_queries: i64,
    pub max_users: i64,
}

/// API representation of usage counters.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/usage-response.ts"
)]
pub struct UsageResponse {
    pub storage_used_bytes: i64,
    pub queries_used: i64,
    pub users_count: i64,
}

/// API representation of an access decision.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/access-decision-response.ts"
)]
pub struct AccessDecisionResponse {
    pub allowed: bool,
    pub reason_code: Option<String>,
    pub tier: Option<String>,
    pub limits: Option<TierLimitsResponse>,
    pub usage: Option<UsageResponse>,
}

impl From<Permission> for PermissionResponse {
    fn from(value: Permission) -> Self {
        Self {
            id: value.id.to_string(),
            name: value.name,
            description: value.description,
            category: value.category,
            actions: value
                .actions
                .iter()
                .map(|action| action.as_str().to_owned())
                .collect(),
            scope: value.scope,
        }
    }
}

impl From<PermissionGroup> for PermissionGroupResponse {
    fn from(value: PermissionGroup) -> Self {
        Self {
            category: value.category,
            permissions: value
                .permissions
                .into_iter()
                .map(PermissionResponse::from)
                .collect(),
        }
    }
}

impl From<RoleDefinition> for RoleResponse {
    fn from(value: RoleDefinition) -> Self {
        Self {
            role_id: value.role_id.to_string(),
            name: value.name,
            description: value.description,
            is_custom: value.is_custom,
            member_count: value.member_count,
            permissions: value
                .permissions
                .into_iter()
                .map(PermissionResponse::from)
                .collect(),
        }
    }
}

impl From<RoleAssignment> for RoleAssignmentResponse {
    fn from(value: RoleAssignment) -> Self {
        Self {
            principal_id: value.principal_id.to_string(),
            role_id: value.role_id.to_string(),
            assigned_by: value.assigned_by.to_string(),
            assigned_at: value.assigned_at.to_rfc3339(),
        }
    }
}

impl From<TierLimits> for TierLimitsResponse {
    fn from(value: TierLimits) -> Self {
        Self {
            storage_bytes: value.storage_bytes,
            monthly_ai_queries: value.monthly_ai_queries,
            max_users: value.max_users,
        }
    }
}

impl From<UsageSnapshot> for UsageResponse {
    fn from(value: UsageSnapshot) -> Self {
        Self {
            storage_used_bytes: value.storage_used_bytes,
            queries_used: value.queries_used,
            users_count: value.users_count,
        }
    }
}

impl From<Decision> for AccessDecisionResponse {
    fn from(value: Decision) -> Self {
        match value {
            Decision::Allowed(AccessGrant { tier, limits, usage }) => Self {
                allowed: true,
                reason_code: None,
                tier: Some(tier.as_str().to_owned()),
                limits: Some(limits.into()),
                usage: usage.map(UsageResponse::from),
            },
            Decision::Denied(reason) => Self {
                allowed: false,
                reason_code: Some(reason.code().to_owned()),
                tier: None,
                limits: None,
                usage: None,
            },
        }
    }
}
