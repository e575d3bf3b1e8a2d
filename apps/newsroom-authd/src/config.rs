//! Application configuration loaded from environment variables.
//!
//! Fail-fast loading with validation: a present but unparsable value is an
//! error, never silently replaced by its default. In production the insecure
//! development signing secret is refused.

use chrono::Duration as ChronoDuration;
use newsroom_auth::{
    DEFAULT_ITERATIONS, DEFAULT_LEEWAY_SECS, DEFAULT_MEMORY_KIB, DEFAULT_PARALLELISM,
    MAX_LEEWAY_SECS, MIN_SECRET_BYTES,
};
use newsroom_api_auth::AuthSettings;
use newsroom_session::StoreConfig;
use std::time::Duration;
use thiserror::Error;

use crate::logging::LogFormat;

/// Development fallback for `JWT_SECRET_KEY`. Refused in production.
pub const INSECURE_JWT_SECRET: &str = "super-secret-key";

/// Upper bound for `REFRESH_TOKEN_EXPIRE_DAYS`.
pub const MAX_REFRESH_TOKEN_DAYS: i64 = 365;

/// Upper bound for `PRINCIPAL_CACHE_TTL_SECONDS`.
const MAX_PRINCIPAL_CACHE_TTL_SECS: u64 = 3600;

// ── AppEnvironment ────────────────────────────────────────────────────────

/// Application environment mode.
///
/// - `Development`: insecure defaults are allowed with WARN-level logging.
/// - `Production`: insecure defaults cause the service to refuse startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Production,
}

impl AppEnvironment {
    /// Parse an `APP_ENV` value. `None` for anything unrecognized.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "production" | "prod" => Some(Self::Production),
            "development" | "dev" => Some(Self::Development),
            _ => None,
        }
    }

    /// Returns true if this is production mode.
    #[must_use]
    pub fn is_production(&self) -> bool {
        *self == Self::Production
    }
}

impl std::fmt::Display for AppEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },
}

/// Argon2id work factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argon2Settings {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

/// Service configuration.
#[derive(Clone)]
pub struct Config {
    pub app_env: AppEnvironment,
    pub jwt_secret: String,
    pub access_token_ttl: ChronoDuration,
    pub refresh_token_ttl: ChronoDuration,
    pub token_leeway_secs: u64,
    pub redis_url: Option<String>,
    pub redis_connect_timeout: Duration,
    pub principal_cache_ttl: Duration,
    pub argon2: Argon2Settings,
    pub health_probe_interval: Duration,
    pub rust_log: String,
    pub log_format: LogFormat,
    /// Startup warnings, logged once logging is initialized.
    pub warnings: Vec<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("app_env", &self.app_env)
            .field("jwt_secret", &"[REDACTED]")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("token_leeway_secs", &self.token_leeway_secs)
            .field("redis_url", &self.redis_url.as_ref().map(|_| "[SET]"))
            .field("redis_connect_timeout", &self.redis_connect_timeout)
            .field("principal_cache_ttl", &self.principal_cache_ttl)
            .field("argon2", &self.argon2)
            .field("health_probe_interval", &self.health_probe_interval)
            .field("rust_log", &self.rust_log)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// Loads `.env` first if present.
    ///
    /// # Required Variables
    ///
    /// - `JWT_SECRET_KEY` - HS256 signing secret (required in production)
    ///
    /// # Optional Variables
    ///
    /// - `APP_ENV` - `development` (default) or `production`
    /// - `ACCESS_TOKEN_EXPIRE_MINUTES` (default: 30)
    /// - `REFRESH_TOKEN_EXPIRE_DAYS` (default: 7, max 365)
    /// - `TOKEN_LEEWAY_SECONDS` (default: 30, max 60)
    /// - `REDIS_URL` - networked session store; unset runs in-process
    /// - `REDIS_CONNECT_TIMEOUT_MS` (default: 2000)
    /// - `PRINCIPAL_CACHE_TTL_SECONDS` (default: 3600, max 3600)
    /// - `ARGON2_MEMORY_KIB`, `ARGON2_ITERATIONS`, `ARGON2_PARALLELISM`
    /// - `HEALTH_PROBE_INTERVAL_SECS` (default: 30)
    /// - `RUST_LOG` - log filter (default: "info")
    /// - `LOG_FORMAT` - `json` (default) or `pretty`
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut warnings = Vec::new();

        let app_env = match get("APP_ENV") {
            None => AppEnvironment::Development,
            Some(raw) => AppEnvironment::parse(&raw).ok_or_else(|| ConfigError::InvalidValue {
                var: "APP_ENV".to_string(),
                message: format!("expected development or production, got {raw:?}"),
            })?,
        };

        let jwt_secret = match get("JWT_SECRET_KEY") {
            Some(secret) => secret,
            None if app_env.is_production() => {
                return Err(ConfigError::MissingVar("JWT_SECRET_KEY".to_string()));
            }
            None => INSECURE_JWT_SECRET.to_string(),
        };
        if jwt_secret == INSECURE_JWT_SECRET {
            if app_env.is_production() {
                return Err(ConfigError::InvalidValue {
                    var: "JWT_SECRET_KEY".to_string(),
                    message: "insecure development secret refused in production".to_string(),
                });
            }
            warnings.push("JWT_SECRET_KEY is the insecure development default".to_string());
        }
        if jwt_secret.len() < MIN_SECRET_BYTES {
            return Err(ConfigError::InvalidValue {
                var: "JWT_SECRET_KEY".to_string(),
                message: format!("must be at least {MIN_SECRET_BYTES} bytes"),
            });
        }

        let access_minutes: i64 = parse_positive(&get, "ACCESS_TOKEN_EXPIRE_MINUTES", 30)?;
        let access_token_ttl =
            ChronoDuration::try_minutes(access_minutes).ok_or_else(|| ConfigError::InvalidValue {
                var: "ACCESS_TOKEN_EXPIRE_MINUTES".to_string(),
                message: format!("{access_minutes} minutes is out of range"),
            })?;

        let refresh_days: i64 = parse_positive(&get, "REFRESH_TOKEN_EXPIRE_DAYS", 7)?;
        if refresh_days > MAX_REFRESH_TOKEN_DAYS {
            return Err(ConfigError::InvalidValue {
                var: "REFRESH_TOKEN_EXPIRE_DAYS".to_string(),
                message: format!("must be at most {MAX_REFRESH_TOKEN_DAYS}"),
            });
        }
        let refresh_token_ttl =
            ChronoDuration::try_days(refresh_days).ok_or_else(|| ConfigError::InvalidValue {
                var: "REFRESH_TOKEN_EXPIRE_DAYS".to_string(),
                message: format!("{refresh_days} days is out of range"),
            })?;

        if access_token_ttl >= refresh_token_ttl {
            return Err(ConfigError::InvalidValue {
                var: "ACCESS_TOKEN_EXPIRE_MINUTES".to_string(),
                message: "access tokens must expire before refresh tokens".to_string(),
            });
        }

        let requested_leeway: u64 = parse_or(&get, "TOKEN_LEEWAY_SECONDS", DEFAULT_LEEWAY_SECS)?;
        if requested_leeway > MAX_LEEWAY_SECS {
            warnings.push(format!(
                "TOKEN_LEEWAY_SECONDS={requested_leeway} clamped to {MAX_LEEWAY_SECS}"
            ));
        }

        let redis_url = get("REDIS_URL");
        let redis_connect_timeout_ms: u64 = parse_positive(&get, "REDIS_CONNECT_TIMEOUT_MS", 2000)?;

        let requested_cache_ttl: u64 = parse_or(
            &get,
            "PRINCIPAL_CACHE_TTL_SECONDS",
            MAX_PRINCIPAL_CACHE_TTL_SECS,
        )?;
        if requested_cache_ttl > MAX_PRINCIPAL_CACHE_TTL_SECS {
            warnings.push(format!(
                "PRINCIPAL_CACHE_TTL_SECONDS={requested_cache_ttl} clamped to {MAX_PRINCIPAL_CACHE_TTL_SECS}"
            ));
        }

        let argon2 = Argon2Settings {
            memory_kib: parse_positive(&get, "ARGON2_MEMORY_KIB", DEFAULT_MEMORY_KIB)?,
            iterations: parse_positive(&get, "ARGON2_ITERATIONS", DEFAULT_ITERATIONS)?,
            parallelism: parse_positive(&get, "ARGON2_PARALLELISM", DEFAULT_PARALLELISM)?,
        };

        let health_probe_secs: u64 = parse_positive(&get, "HEALTH_PROBE_INTERVAL_SECS", 30)?;
        let rust_log = get("RUST_LOG").unwrap_or_else(|| "info".to_string());
        let log_format = match get("LOG_FORMAT") {
            None => LogFormat::default(),
            Some(raw) => LogFormat::parse(&raw).ok_or_else(|| ConfigError::InvalidValue {
                var: "LOG_FORMAT".to_string(),
                message: format!("expected json or pretty, got {raw:?}"),
            })?,
        };

        Ok(Self {
            app_env,
            jwt_secret,
            access_token_ttl,
            refresh_token_ttl,
            token_leeway_secs: requested_leeway.min(MAX_LEEWAY_SECS),
            redis_url,
            redis_connect_timeout: Duration::from_millis(redis_connect_timeout_ms),
            principal_cache_ttl: Duration::from_secs(
                requested_cache_ttl.min(MAX_PRINCIPAL_CACHE_TTL_SECS),
            ),
            argon2,
            health_probe_interval: Duration::from_secs(health_probe_secs),
            rust_log,
            log_format,
            warnings,
        })
    }

    /// Session store connection settings.
    #[must_use]
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            url: self.redis_url.clone(),
            connect_timeout: self.redis_connect_timeout,
        }
    }

    /// Token lifetimes for the auth service.
    #[must_use]
    pub fn auth_settings(&self) -> AuthSettings {
        AuthSettings {
            access_ttl: self.access_token_ttl,
            refresh_ttl: self.refresh_token_ttl,
        }
    }
}

fn parse_or<T, G>(get: &G, var: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            var: var.to_string(),
            message: e.to_string(),
        }),
    }
}

fn parse_positive<T, G>(get: &G, var: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    let value = parse_or(get, var, default)?;
    if value <= T::default() {
        return Err(ConfigError::InvalidValue {
            var: var.to_string(),
            message: "must be positive".to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_in_development() {
        let config = load(&[]).unwrap();
        assert_eq!(config.app_env, AppEnvironment::Development);
        assert_eq!(config.jwt_secret, INSECURE_JWT_SECRET);
        assert_eq!(config.access_token_ttl, ChronoDuration::minutes(30));
        assert_eq!(config.refresh_token_ttl, ChronoDuration::days(7));
        assert_eq!(config.token_leeway_secs, 30);
        assert!(config.redis_url.is_none());
        assert_eq!(config.redis_connect_timeout, Duration::from_millis(2000));
        assert_eq!(config.principal_cache_ttl, Duration::from_secs(3600));
        assert_eq!(config.argon2.memory_kib, 19456);
        assert_eq!(config.health_probe_interval, Duration::from_secs(30));
        assert_eq!(config.rust_log, "info");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.warnings.len(), 1);
    }

    #[test]
    fn test_production_requires_secret() {
        assert!(matches!(
            load(&[("APP_ENV", "production")]),
            Err(ConfigError::MissingVar(var)) if var == "JWT_SECRET_KEY"
        ));
        assert!(matches!(
            load(&[("APP_ENV", "prod"), ("JWT_SECRET_KEY", INSECURE_JWT_SECRET)]),
            Err(ConfigError::InvalidValue { .. })
        ));

        let config = load(&[
            ("APP_ENV", "production"),
            ("JWT_SECRET_KEY", "a-long-random-production-secret"),
        ])
        .unwrap();
        assert!(config.app_env.is_production());
        assert!(config.warnings.is_empty());
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(matches!(
            load(&[("JWT_SECRET_KEY", "short")]),
            Err(ConfigError::InvalidValue { var, .. }) if var == "JWT_SECRET_KEY"
        ));
    }

    #[test]
    fn test_unparsable_values_fail_fast() {
        for (var, value) in [
            ("APP_ENV", "staging"),
            ("ACCESS_TOKEN_EXPIRE_MINUTES", "soon"),
            ("REFRESH_TOKEN_EXPIRE_DAYS", "0"),
            ("REDIS_CONNECT_TIMEOUT_MS", "-5"),
            ("ARGON2_ITERATIONS", "0"),
            ("LOG_FORMAT", "xml"),
            ("REFRESH_TOKEN_EXPIRE_DAYS", "366"),
            ("REFRESH_TOKEN_EXPIRE_DAYS", "100000000"),
            ("REFRESH_TOKEN_EXPIRE_DAYS", "200000000000000"),
            ("ACCESS_TOKEN_EXPIRE_MINUTES", "9223372036854775807"),
            ("ACCESS_TOKEN_EXPIRE_MINUTES", "100000000"),
        ] {
            assert!(
                matches!(load(&[(var, value)]), Err(ConfigError::InvalidValue { .. })),
                "{var}={value}"
            );
        }
    }

    #[test]
    fn test_longest_allowed_refresh_ttl_mints() {
        let config = load(&[("REFRESH_TOKEN_EXPIRE_DAYS", "365")]).unwrap();
        assert_eq!(config.refresh_token_ttl, ChronoDuration::days(MAX_REFRESH_TOKEN_DAYS));

        let codec = newsroom_auth::TokenCodec::new(config.jwt_secret.as_bytes()).unwrap();
        let minted = codec
            .mint_refresh(newsroom_core::UserId::new(), config.auth_settings().refresh_ttl)
            .unwrap();
        assert!(minted.expires_at > chrono::Utc::now() + ChronoDuration::days(364));
    }

    #[test]
    fn test_access_must_be_shorter_than_refresh() {
        assert!(load(&[
            ("ACCESS_TOKEN_EXPIRE_MINUTES", "2880"),
            ("REFRESH_TOKEN_EXPIRE_DAYS", "1"),
        ])
        .is_err());
    }

    #[test]
    fn test_leeway_and_cache_ttl_clamped() {
        let config = load(&[
            ("TOKEN_LEEWAY_SECONDS", "300"),
            ("PRINCIPAL_CACHE_TTL_SECONDS", "86400"),
        ])
        .unwrap();
        assert_eq!(config.token_leeway_secs, 60);
        assert_eq!(config.principal_cache_ttl, Duration::from_secs(3600));
        assert_eq!(config.warnings.len(), 3);
    }

    #[test]
    fn test_store_config_and_debug_redaction() {
        let config = load(&[
            ("JWT_SECRET_KEY", "a-long-random-development-secret"),
            ("REDIS_URL", "redis://:hunter2@cache:6379"),
            ("REDIS_CONNECT_TIMEOUT_MS", "500"),
        ])
        .unwrap();
        let store = config.store_config();
        assert_eq!(store.url.as_deref(), Some("redis://:hunter2@cache:6379"));
        assert_eq!(store.connect_timeout, Duration::from_millis(500));
        assert_eq!(config.auth_settings().access_ttl, ChronoDuration::minutes(30));

        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("a-long-random-development-secret"));
    }
}
