use axum::Json;
use axum::extract::{Extension, State};
use axum::http::StatusCode;

use praetoria_application::RoleId;
use praetoria_core::{PrincipalId, UserIdentity};

use crate::dto::{AssignRoleRequest, RemoveRoleAssignmentRequest, RoleAssignmentResponse};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_role_assignments_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<Vec<RoleAssignmentResponse>>> {
    let assignments = state
        .role_registry
        .list_assignments(user.principal_id())
        .await?
        .into_iter()
        .map(RoleAssignmentResponse::from)
        .collect();

    Ok(Json(assignments))
}

pub async fn assign_role_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<AssignRoleRequest>,
) -> ApiResult<StatusCode> {
    state
        .role_registry
        .assign_role(
            user.principal_id(),
            PrincipalId::from_uuid(payload.principal_id),
            RoleId::from_uuid(payload.role_id),
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn unassign_role_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<RemoveRoleAssignmentRequest>,
) -> ApiResult<StatusCode> {
    state
        .role_registry
        .unassign_role(
            user.principal_id(),
            PrincipalId::from_uuid(payload.principal_id),
            RoleId::from_uuid(payload.role_id),
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
