use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub auth: AuthConfig,
    pub session: SessionConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

/// Token issuance and credential settings.
///
/// The four signing secrets are process-wide and read-only after startup.
/// They are deliberately excluded from Serialize output so a dumped config
/// can never echo secret material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(skip_serializing)]
    pub tenant_access_secret: String,
    #[serde(skip_serializing)]
    pub tenant_refresh_secret: String,
    #[serde(skip_serializing)]
    pub platform_access_secret: String,
    #[serde(skip_serializing)]
    pub platform_refresh_secret: String,
    pub access_token_ttl_hours: i64,
    pub refresh_token_ttl_days: i64,
    /// Platform operator sign-in identity. Provisioned, never registered.
    pub operator_email: Option<String>,
    /// Argon2 PHC string for the operator password.
    #[serde(skip_serializing)]
    pub operator_password_hash: Option<String>,
    /// Deprecated fallback: accept a refresh token in the request body when
    /// no cookie is present.
    pub allow_refresh_in_body: bool,
    /// Legacy deployments carry the refresh token in the cookie instead of
    /// an opaque session id.
    pub cookie_carries_refresh: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub backend: SessionBackend,
    pub redis_url: String,
    pub ttl_secs: u64,
    /// Upper bound for any single store command; a timeout is treated the
    /// same as an unreachable store.
    pub command_timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    Redis,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    pub enable_request_logging: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Auth overrides
        if let Ok(v) = env::var("AUTH_TENANT_ACCESS_SECRET") {
            self.auth.tenant_access_secret = v;
        }
        if let Ok(v) = env::var("AUTH_TENANT_REFRESH_SECRET") {
            self.auth.tenant_refresh_secret = v;
        }
        if let Ok(v) = env::var("AUTH_PLATFORM_ACCESS_SECRET") {
            self.auth.platform_access_secret = v;
        }
        if let Ok(v) = env::var("AUTH_PLATFORM_REFRESH_SECRET") {
            self.auth.platform_refresh_secret = v;
        }
        if let Ok(v) = env::var("AUTH_ACCESS_TTL_HOURS") {
            self.auth.access_token_ttl_hours = v.parse().unwrap_or(self.auth.access_token_ttl_hours);
        }
        if let Ok(v) = env::var("AUTH_REFRESH_TTL_DAYS") {
            self.auth.refresh_token_ttl_days = v.parse().unwrap_or(self.auth.refresh_token_ttl_days);
        }
        if let Ok(v) = env::var("PLATFORM_OPERATOR_EMAIL") {
            self.auth.operator_email = Some(v);
        }
        if let Ok(v) = env::var("PLATFORM_OPERATOR_PASSWORD_HASH") {
            self.auth.operator_password_hash = Some(v);
        }
        if let Ok(v) = env::var("AUTH_ALLOW_REFRESH_IN_BODY") {
            self.auth.allow_refresh_in_body = v.parse().unwrap_or(self.auth.allow_refresh_in_body);
        }
        if let Ok(v) = env::var("AUTH_COOKIE_CARRIES_REFRESH") {
            self.auth.cookie_carries_refresh = v.parse().unwrap_or(self.auth.cookie_carries_refresh);
        }

        // Session overrides
        if let Ok(v) = env::var("SESSION_BACKEND") {
            self.session.backend = match v.as_str() {
                "redis" => SessionBackend::Redis,
                "memory" => SessionBackend::Memory,
                _ => self.session.backend,
            };
        }
        if let Ok(v) = env::var("REDIS_URL") {
            self.session.redis_url = v;
        }
        if let Ok(v) = env::var("SESSION_TTL_SECS") {
            self.session.ttl_secs = v.parse().unwrap_or(self.session.ttl_secs);
        }
        if let Ok(v) = env::var("SESSION_COMMAND_TIMEOUT_MS") {
            self.session.command_timeout_ms = v.parse().unwrap_or(self.session.command_timeout_ms);
        }

        // API overrides
        if let Ok(v) = env::var("API_ENABLE_CORS") {
            self.api.enable_cors = v.parse().unwrap_or(self.api.enable_cors);
        }
        if let Ok(v) = env::var("API_CORS_ORIGINS") {
            self.api.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            auth: AuthConfig {
                tenant_access_secret: "dev-tenant-access-secret".to_string(),
                tenant_refresh_secret: "dev-tenant-refresh-secret".to_string(),
                platform_access_secret: "dev-platform-access-secret".to_string(),
                platform_refresh_secret: "dev-platform-refresh-secret".to_string(),
                access_token_ttl_hours: 8,
                refresh_token_ttl_days: 30,
                operator_email: None,
                operator_password_hash: None,
                allow_refresh_in_body: false,
                cookie_carries_refresh: false,
            },
            session: SessionConfig {
                backend: SessionBackend::Memory,
                redis_url: "redis://127.0.0.1:6379".to_string(),
                ttl_secs: 60 * 60 * 24,
                command_timeout_ms: 1000,
            },
            api: ApiConfig {
                enable_cors: true,
                cors_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ],
                enable_request_logging: true,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            auth: AuthConfig {
                tenant_access_secret: String::new(),
                tenant_refresh_secret: String::new(),
                platform_access_secret: String::new(),
                platform_refresh_secret: String::new(),
                access_token_ttl_hours: 4,
                refresh_token_ttl_days: 14,
                operator_email: None,
                operator_password_hash: None,
                allow_refresh_in_body: false,
                cookie_carries_refresh: false,
            },
            session: SessionConfig {
                backend: SessionBackend::Redis,
                redis_url: "redis://127.0.0.1:6379".to_string(),
                ttl_secs: 60 * 60 * 12,
                command_timeout_ms: 500,
            },
            api: ApiConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
                enable_request_logging: true,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            auth: AuthConfig {
                // Empty in defaults; must come from the environment.
                tenant_access_secret: String::new(),
                tenant_refresh_secret: String::new(),
                platform_access_secret: String::new(),
                platform_refresh_secret: String::new(),
                access_token_ttl_hours: 2,
                refresh_token_ttl_days: 7,
                operator_email: None,
                operator_password_hash: None,
                allow_refresh_in_body: false,
                cookie_carries_refresh: false,
            },
            session: SessionConfig {
                backend: SessionBackend::Redis,
                redis_url: "redis://127.0.0.1:6379".to_string(),
                ttl_secs: 60 * 60 * 8,
                command_timeout_ms: 300,
            },
            api: ApiConfig {
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
                enable_request_logging: false,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
