use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use uuid::Uuid;

use praetoria_application::{CreateRoleInput, RoleId, UpdateRoleInput};
use praetoria_core::UserIdentity;
use praetoria_domain::PermissionId;

use crate::dto::{
    CreateRoleRequest, PermissionGroupResponse, RoleResponse, UpdateRoleRequest,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_roles_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    let roles = state
        .role_registry
        .list_roles(user.principal_id())
        .await?
        .into_iter()
        .map(RoleResponse::from)
        .collect();

    Ok(Json(roles))
}

pub async fn get_role_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(role_id): Path<Uuid>,
) -> ApiResult<Json<RoleResponse>> {
    let role = state
        .role_registry
        .get_role(user.principal_id(), RoleId::from_uuid(role_id))
        .await?;

    Ok(Json(RoleResponse::from(role)))
}

pub async fn create_role_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<CreateRoleRequest>,
) -> ApiResult<(StatusCode, Json<RoleResponse>)> {
    let role = state
        .role_registry
        .create_role(
            user.principal_id(),
            CreateRoleInput {
                name: payload.name,
                description: payload.description,
                permission_ids: payload
                    .permission_ids
                    .into_iter()
                    .map(PermissionId::from_uuid)
                    .collect(),
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(RoleResponse::from(role))))
}

pub async fn update_role_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(role_id): Path<Uuid>,
    Json(payload): Json<UpdateRoleRequest>,
) -> ApiResult<Json<RoleResponse>> {
    let role = state
        .role_registry
        .update_role(
            user.principal_id(),
            RoleId::from_uuid(role_id),
            UpdateRoleInput {
                name: payload.name,
                description: payload.description,
                permission_ids: payload.permission_ids.map(|permission_ids| {
                    permission_ids
                        .into_iter()
                        .map(PermissionId::from_uuid)
                        .collect()
                }),
            },
        )
        .await?;

    Ok(Json(RoleResponse::from(role)))
}

pub async fn delete_role_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(role_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .role_registry
        .delete_role(user.principal_id(), RoleId::from_uuid(role_id))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_permissions_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<Vec<PermissionGroupResponse>>> {
    let groups = state
        .role_registry
        .list_permission_groups(user.principal_id())
        .await?
        .into_iter()
        .map(PermissionGroupResponse::from)
        .collect();

    Ok(Json(groups))
}
