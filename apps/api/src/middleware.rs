use axum::Extension;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use praetoria_application::RateLimitRule;
use praetoria_core::{AppError, PrincipalId, UserIdentity};

use crate::error::ApiResult;
use crate::state::AppState;

const GATEWAY_TOKEN_HEADER: &str = "x-gateway-token";
const PRINCIPAL_ID_HEADER: &str = "x-principal-id";
const PRINCIPAL_NAME_HEADER: &str = "x-principal-name";
const PRINCIPAL_EMAIL_HEADER: &str = "x-principal-email";

/// Records one attempt against the route group's rule, keyed by client
/// address. Runs before authentication so unauthenticated floods are
/// absorbed here.
pub async fn rate_limit(
    State(state): State<AppState>,
    Extension(rule): Extension<RateLimitRule>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let client_key = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("unknown")
        .to_owned();

    state
        .rate_limit_service
        .check_rate_limit(&rule, &client_key)
        .await?;

    Ok(next.run(request).await)
}

/// Resolves the caller identity from gateway-verified headers.
///
/// The gateway terminates the session and forwards the principal; the
/// shared token proves the request actually came through it.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let headers = request.headers();

    let token = headers
        .get(GATEWAY_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if token != state.gateway_token {
        return Err(AppError::Unauthorized("authentication required".to_owned()).into());
    }

    let principal_id = headers
        .get(PRINCIPAL_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| uuid::Uuid::parse_str(value).ok())
        .map(PrincipalId::from_uuid)
        .ok_or_else(|| AppError::Unauthorized("missing principal identity".to_owned()))?;

    let display_name = headers
        .get(PRINCIPAL_NAME_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    let email = headers
        .get(PRINCIPAL_EMAIL_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let identity = UserIdentity::new(principal_id, display_name, email);
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}
