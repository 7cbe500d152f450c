use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

/// Secret used when nothing is configured. Refused in production.
pub const DEV_JWT_SECRET: &str = "lawdesk-development-secret-change-me";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub backend: BackendKind,
    pub security: SecurityConfig,
    pub auth: AuthConfig,
    pub currency: CurrencyConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub session_expiry_hours: u64,
    pub cors_origins: Vec<String>,
    pub cookie_secure: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub min_password_length: u64,
    pub allow_sign_up: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyConfig {
    pub code: String,
    pub symbol: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub limit: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Profile defaults first, then individual variables
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("LAWDESK_HOST") {
            self.server.host = v;
        }
        if let Some(v) = env::var("LAWDESK_PORT").ok().or_else(|| env::var("PORT").ok()) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }

        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v).filter(|url| !url.is_empty());
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        if let Ok(v) = env::var("LAWDESK_BACKEND") {
            match v.to_ascii_lowercase().as_str() {
                "memory" => self.backend = BackendKind::Memory,
                "postgres" | "pg" => self.backend = BackendKind::Postgres,
                other => tracing::warn!("Unknown LAWDESK_BACKEND '{}', keeping {:?}", other, self.backend),
            }
        }

        if let Ok(v) = env::var("JWT_SECRET") {
            if !v.is_empty() {
                self.security.jwt_secret = v;
            }
        }
        if let Ok(v) = env::var("SESSION_EXPIRY_HOURS") {
            self.security.session_expiry_hours = v.parse().unwrap_or(self.security.session_expiry_hours);
        }
        if let Ok(v) = env::var("CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(v) = env::var("COOKIE_SECURE") {
            self.security.cookie_secure = v.parse().unwrap_or(self.security.cookie_secure);
        }

        if let Ok(v) = env::var("AUTH_MIN_PASSWORD_LENGTH") {
            self.auth.min_password_length = v.parse().unwrap_or(self.auth.min_password_length);
        }
        if let Ok(v) = env::var("AUTH_ALLOW_SIGN_UP") {
            self.auth.allow_sign_up = v.parse().unwrap_or(self.auth.allow_sign_up);
        }

        if let Ok(v) = env::var("CURRENCY_CODE") {
            self.currency.code = v;
        }
        if let Ok(v) = env::var("CURRENCY_SYMBOL") {
            self.currency.symbol = v;
        }
        if let Ok(v) = env::var("CURRENCY_NAME") {
            self.currency.name = v;
        }

        if let Ok(v) = env::var("SEARCH_LIMIT") {
            self.search.limit = v.parse().unwrap_or(self.search.limit);
        }

        self
    }

    /// Checks that must hold before the server accepts traffic.
    pub fn validate(&self) -> Result<(), String> {
        if self.environment == Environment::Production && self.security.jwt_secret == DEV_JWT_SECRET {
            return Err("JWT_SECRET must be set in production".to_string());
        }
        if self.backend == BackendKind::Postgres && self.database.url.is_none() {
            return Err("DATABASE_URL is required for the postgres backend".to_string());
        }
        if self.search.limit == 0 {
            return Err("SEARCH_LIMIT must be positive".to_string());
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            backend: BackendKind::Memory,
            security: SecurityConfig {
                jwt_secret: DEV_JWT_SECRET.to_string(),
                session_expiry_hours: 24 * 7,
                cors_origins: vec!["http://localhost:5173".to_string(), "http://localhost:8080".to_string()],
                cookie_secure: false,
            },
            auth: AuthConfig::default(),
            currency: CurrencyConfig::default(),
            search: SearchConfig { limit: 5 },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            backend: BackendKind::Postgres,
            security: SecurityConfig {
                jwt_secret: DEV_JWT_SECRET.to_string(),
                session_expiry_hours: 24,
                cors_origins: vec![],
                cookie_secure: true,
            },
            auth: AuthConfig::default(),
            currency: CurrencyConfig::default(),
            search: SearchConfig { limit: 5 },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            backend: BackendKind::Postgres,
            security: SecurityConfig {
                jwt_secret: DEV_JWT_SECRET.to_string(),
                session_expiry_hours: 12,
                cors_origins: vec![],
                cookie_secure: true,
            },
            auth: AuthConfig {
                allow_sign_up: false,
                ..AuthConfig::default()
            },
            currency: CurrencyConfig::default(),
            search: SearchConfig { limit: 5 },
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            min_password_length: 6,
            allow_sign_up: true,
        }
    }
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            code: "PKR".to_string(),
            symbol: "Rs".to_string(),
            name: "Pakistani Rupee".to_string(),
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}
