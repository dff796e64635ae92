//! Praetoria API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use praetoria_application::{
    AccessEvaluator, PermissionCache, PermissionStore, RateLimitRule, RateLimitService,
    RoleRegistry,
};
use praetoria_core::AppError;
use praetoria_infrastructure::{
    InMemoryPermissionCache, PostgresAuditRepository, PostgresRateLimitRepository,
    PostgresRoleDirectory, PostgresSubscriptionRepository, RedisPermissionCache,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api_config::{ApiConfig, PermissionCacheConfig};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    if config.migrate_only {
        info!("database migrations applied successfully");
        return Ok(());
    }

    let permission_cache: Arc<dyn PermissionCache> = match &config.permission_cache {
        PermissionCacheConfig::Memory => Arc::new(InMemoryPermissionCache::new()),
        PermissionCacheConfig::Redis { url } => {
            let client = redis::Client::open(url.as_str()).map_err(|error| {
                AppError::Validation(format!("invalid REDIS_URL: {error}"))
            })?;
            Arc::new(RedisPermissionCache::new(client, "praetoria:permissions"))
        }
    };

    let role_directory = Arc::new(PostgresRoleDirectory::new(pool.clone()));
    let audit_repository = Arc::new(PostgresAuditRepository::new(pool.clone()));
    let subscription_repository = Arc::new(PostgresSubscriptionRepository::new(pool.clone()));

    let permission_store = PermissionStore::new(role_directory.clone(), permission_cache);
    let role_registry = RoleRegistry::new(
        role_directory,
        permission_store.clone(),
        audit_repository,
    );
    let access_evaluator = AccessEvaluator::new(
        permission_store.clone(),
        subscription_repository,
        config.tier_limits.clone(),
    );

    let rate_limit_repository = Arc::new(PostgresRateLimitRepository::new(pool.clone()));
    let rate_limit_service = RateLimitService::new(rate_limit_repository);
    spawn_rate_limit_cleanup(rate_limit_service.clone());

    let app_state = AppState {
        role_registry,
        permission_store,
        access_evaluator,
        rate_limit_service,
        gateway_token: config.gateway_token.clone(),
        frontend_url: config.frontend_url.clone(),
    };

    // Read traffic: generous budget per client address.
    let read_rate_rule = RateLimitRule::new("access_read", 120, 60);
    // Administrative mutations: 30 per client address per 15 minutes.
    let admin_rate_rule = RateLimitRule::new("access_admin", 30, 15 * 60);

    let read_routes = Router::new()
        .route(
            "/api/access/me/permissions",
            get(handlers::access::my_permissions_handler),
        )
        .route(
            "/api/access/evaluate",
            post(handlers::access::evaluate_access_handler),
        )
        .route(
            "/api/access/permissions",
            get(handlers::roles::list_permissions_handler),
        )
        .route(
            "/api/access/roles",
            get(handlers::roles::list_roles_handler),
        )
        .route(
            "/api/access/roles/{role_id}",
            get(handlers::roles::get_role_handler),
        )
        .route(
            "/api/access/role-assignments",
            get(handlers::assignments::list_role_assignments_handler),
        )
        .route_layer(from_fn_with_state(app_state.clone(), middleware::require_auth))
        .route_layer(from_fn_with_state(app_state.clone(), middleware::rate_limit))
        .layer(axum::Extension(read_rate_rule));

    let admin_routes = Router::new()
        .route(
            "/api/access/roles",
            post(handlers::roles::create_role_handler),
        )
        .route(
            "/api/access/roles/{role_id}",
            axum::routing::put(handlers::roles::update_role_handler)
                .delete(handlers::roles::delete_role_handler),
        )
        .route(
            "/api/access/role-assignments",
            post(handlers::assignments::assign_role_handler),
        )
        .route(
            "/api/access/role-unassignments",
            post(handlers::assignments::unassign_role_handler),
        )
        .route_layer(from_fn_with_state(app_state.clone(), middleware::require_auth))
        .route_layer(from_fn_with_state(app_state.clone(), middleware::rate_limit))
        .layer(axum::Extension(admin_rate_rule));

    let cors_layer = CorsLayer::new()
        .allow_origin(
            HeaderValue::from_str(&config.frontend_url)
                .map_err(|error| AppError::Internal(format!("invalid FRONTEND_URL: {error}")))?,
        )
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE]);

    let app = Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(read_routes)
        .merge(admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(app_state);

    let host = IpAddr::from_str(&config.api_host).map_err(|error| {
        AppError::Internal(format!("invalid API_HOST '{}': {error}", config.api_host))
    })?;
    let address = SocketAddr::from((host, config.api_port));

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "praetoria-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}

fn spawn_rate_limit_cleanup(service: RateLimitService) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60 * 60));
        loop {
            interval.tick().await;
            match service.cleanup().await {
                Ok(removed) if removed > 0 => {
                    info!(removed, "removed expired rate limit entries");
                }
                Ok(_) => {}
                Err(error) => {
                    tracing::warn!(%error, "rate limit cleanup failed");
                }
            }
        }
    });
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
