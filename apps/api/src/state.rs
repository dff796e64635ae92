use praetoria_application::{AccessEvaluator, PermissionStore, RateLimitService, RoleRegistry};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub role_registry: RoleRegistry,
    pub permission_store: PermissionStore,
    pub access_evaluator: AccessEvaluator,
    pub rate_limit_service: RateLimitService,
    pub gateway_token: String,
    pub frontend_url: String,
}
