use std::str::FromStr;

use axum::Json;
use axum::extract::{Extension, State};

use praetoria_application::AccessRequest;
use praetoria_core::{AppError, UserIdentity};
use praetoria_domain::{PermissionAction, ResourceCategory, SubscriptionTier};

use crate::dto::{AccessDecisionResponse, EvaluateAccessRequest, PermissionResponse};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn my_permissions_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<Vec<PermissionResponse>>> {
    let permissions = state
        .permission_store
        .effective_permissions(user.principal_id())
        .await?
        .into_iter()
        .map(PermissionResponse::from)
        .collect();

    Ok(Json(permissions))
}

pub async fn evaluate_access_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<EvaluateAccessRequest>,
) -> ApiResult<Json<AccessDecisionResponse>> {
    let request = parse_request(payload)?;
    let decision = state
        .access_evaluator
        .evaluate(user.principal_id(), &request)
        .await?;

    Ok(Json(AccessDecisionResponse::from(decision)))
}

fn parse_request(payload: EvaluateAccessRequest) -> Result<AccessRequest, AppError> {
    let action = payload
        .action
        .as_deref()
        .map(PermissionAction::from_str)
        .transpose()?;
    let required_tier = payload
        .required_tier
        .as_deref()
        .map(SubscriptionTier::from_str)
        .transpose()?;
    let resource = payload
        .resource
        .as_deref()
        .map(ResourceCategory::from_str)
        .transpose()?;

    Ok(AccessRequest {
        permission: payload.permission,
        scope: payload.scope,
        action,
        required_tier,
        require_active_subscription: payload.require_active_subscription,
        allow_trial: payload.allow_trial,
        resource,
    })
}
