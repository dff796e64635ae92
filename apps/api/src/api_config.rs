use std::collections::BTreeMap;
use std::env;

use praetoria_core::AppError;
use praetoria_domain::{TierLimitSchedule, TierLimits, SubscriptionTier};

/// Cache backend selection for effective permission sets.
#[derive(Debug, Clone)]
pub enum PermissionCacheConfig {
    /// Process-local cache, suitable for a single API instance.
    Memory,
    /// Shared cache so every instance observes the same invalidations.
    Redis { url: String },
}

/// Runtime configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub database_url: String,
    pub frontend_url: String,
    pub gateway_token: String,
    pub api_host: String,
    pub api_port: u16,
    pub permission_cache: PermissionCacheConfig,
    pub tier_limits: TierLimitSchedule,
}

impl ApiConfig {
    /// Loads configuration from environment variables.
    pub fn load() -> Result<Self, AppError> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");

        let database_url = required_env("DATABASE_URL")?;
        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned());
        let gateway_token = required_env("GATEWAY_TOKEN")?;
        if gateway_token.len() < 32 {
            return Err(AppError::Validation(
                "GATEWAY_TOKEN must be at least 32 characters".to_owned(),
            ));
        }

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let api_port = env::var("API_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3001);

        let permission_cache = match env::var("PERMISSION_CACHE")
            .unwrap_or_else(|_| "memory".to_owned())
            .as_str()
        {
            "memory" => PermissionCacheConfig::Memory,
            "redis" => PermissionCacheConfig::Redis {
                url: required_env("REDIS_URL")?,
            },
            other => {
                return Err(AppError::Validation(format!(
                    "PERMISSION_CACHE must be either 'memory' or 'redis', got '{other}'"
                )));
            }
        };

        // TIER_LIMITS_JSON replaces the whole schedule or nothing; a partial
        // table is a configuration error.
        let tier_limits = match env::var("TIER_LIMITS_JSON") {
            Ok(raw) if !raw.trim().is_empty() => {
                let table: BTreeMap<SubscriptionTier, TierLimits> = serde_json::from_str(&raw)
                    .map_err(|error| {
                        AppError::Validation(format!("invalid TIER_LIMITS_JSON: {error}"))
                    })?;
                TierLimitSchedule::from_table(table)?
            }
            _ => TierLimitSchedule::baseline(),
        };

        Ok(Self {
            migrate_only,
            database_url,
            frontend_url,
            gateway_token,
            api_host,
            api_port,
            permission_cache,
            tier_limits,
        })
    }
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}
