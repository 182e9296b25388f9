//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables with the
//! `config` and `dotenvy` crates. Variables use the `LIFEBUDDY` prefix and
//! `__` between nested keys.
//!
//! # Example
//!
//! ```no_run
//! use lifebuddy::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod auth;
mod database;
mod entitlements;
mod error;
mod server;

pub use auth::{AuthConfig, MIN_PRODUCTION_SECRET_BYTES};
pub use database::DatabaseConfig;
pub use entitlements::EntitlementsConfig;
pub use error::{ConfigError, ValidationError};
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// PostgreSQL; subscriptions are kept in memory when absent
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    pub auth: AuthConfig,

    #[serde(default)]
    pub entitlements: EntitlementsConfig,
}

impl AppConfig {
    /// Load configuration from `.env` (if present) and the environment.
    ///
    /// - `LIFEBUDDY__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `LIFEBUDDY__AUTH__JWT_SECRET=...` -> `auth.jwt_secret = ...`
    /// - `LIFEBUDDY__ENTITLEMENTS__ADMIN_EMAILS=a@x.io,b@x.io`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing or a value
    /// cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("LIFEBUDDY")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        if let Some(database) = &self.database {
            database.validate()?;
        }
        self.auth.validate(&self.server.environment)?;
        self.entitlements.validate()?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: [&str; 7] = [
        "LIFEBUDDY__AUTH__JWT_SECRET",
        "LIFEBUDDY__DATABASE__URL",
        "LIFEBUDDY__SERVER__PORT",
        "LIFEBUDDY__SERVER__ENVIRONMENT",
        "LIFEBUDDY__ENTITLEMENTS__ADMIN_EMAILS",
        "LIFEBUDDY__ENTITLEMENTS__TRIAL_DAYS",
        "LIFEBUDDY__ENTITLEMENTS__REQUIRED_SHARES",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    fn load_with(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        clear_env();
        env::set_var("LIFEBUDDY__AUTH__JWT_SECRET", "test-secret");
        for (key, value) in vars {
            env::set_var(key, value);
        }
        let result = AppConfig::load();
        clear_env();
        result
    }

    #[test]
    fn loads_minimal_environment_with_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[]).unwrap();

        assert_eq!(config.server.port, 5001);
        assert!(config.database.is_none());
        assert_eq!(config.entitlements.trial_days, 7);
        assert_eq!(config.entitlements.required_shares, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn reads_nested_sections() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[
            ("LIFEBUDDY__DATABASE__URL", "postgres://lb@localhost/lifebuddy"),
            ("LIFEBUDDY__SERVER__PORT", "8080"),
            ("LIFEBUDDY__ENTITLEMENTS__ADMIN_EMAILS", "ops@lifebuddy.app"),
            ("LIFEBUDDY__ENTITLEMENTS__TRIAL_DAYS", "14"),
        ])
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(
            config.database.as_ref().map(|d| d.url.as_str()),
            Some("postgres://lb@localhost/lifebuddy")
        );
        assert!(config.entitlements.admin_allowlist().is_admin_email("ops@lifebuddy.app"));
        assert_eq!(config.entitlements.trial_policy().trial_days, 14);
    }

    #[test]
    fn missing_jwt_secret_fails_to_load() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let result = AppConfig::load();
        assert!(matches!(result, Err(ConfigError::LoadError(_))));
    }

    #[test]
    fn production_rejects_short_secret() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[("LIFEBUDDY__SERVER__ENVIRONMENT", "production")]).unwrap();

        assert!(config.is_production());
        assert_eq!(
            config.validate(),
            Err(ValidationError::JwtSecretTooShort(32))
        );
    }

    #[test]
    fn out_of_range_trial_is_rejected() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[("LIFEBUDDY__ENTITLEMENTS__TRIAL_DAYS", "0")]).unwrap();
        assert_eq!(config.validate(), Err(ValidationError::InvalidTrialDays(90)));
    }
}
