use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;

use crate::throttle::{Period, Rate, Scope};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub throttle: ThrottleConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub access_token_minutes: i64,
    pub refresh_token_hours: i64,
    pub password_hash_rounds: u32,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrottleConfig {
    pub enabled: bool,
    pub rates: BTreeMap<Scope, Rate>,
}

impl ThrottleConfig {
    pub fn rate(&self, scope: Scope) -> Option<Rate> {
        self.rates.get(&scope).copied()
    }

    fn with_rates(enabled: bool, rates: &[(Scope, Rate)]) -> Self {
        Self {
            enabled,
            rates: rates.iter().copied().collect(),
        }
    }
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
        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // API overrides
        if let Ok(v) = env::var("API_PORT").or_else(|_| env::var("PORT")) {
            self.api.port = v.parse().unwrap_or(self.api.port);
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_ACCESS_TOKEN_MINUTES") {
            self.security.access_token_minutes = v.parse().unwrap_or(self.security.access_token_minutes);
        }
        if let Ok(v) = env::var("SECURITY_REFRESH_TOKEN_HOURS") {
            self.security.refresh_token_hours = v.parse().unwrap_or(self.security.refresh_token_hours);
        }
        if let Ok(v) = env::var("SECURITY_PASSWORD_HASH_ROUNDS") {
            self.security.password_hash_rounds = v.parse().unwrap_or(self.security.password_hash_rounds);
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        // Throttle overrides
        if let Ok(v) = env::var("THROTTLE_ENABLED") {
            self.throttle.enabled = v.parse().unwrap_or(self.throttle.enabled);
        }
        for scope in Scope::ALL {
            if let Ok(v) = env::var(scope.env_key()) {
                match v.parse::<Rate>() {
                    Ok(rate) => {
                        self.throttle.rates.insert(scope, rate);
                    }
                    Err(e) => tracing::warn!("Ignoring {}: {}", scope.env_key(), e),
                }
            }
        }

        self
    }

    pub fn development() -> Self {
        use Period::*;

        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                url: None,
                max_connections: 5,
                connection_timeout: 30,
            },
            api: ApiConfig {
                port: 8000,
                enable_request_logging: true,
                max_request_size_bytes: 1024 * 1024, // 1MB
            },
            security: SecurityConfig {
                jwt_secret: "development-insecure-secret-change-me".to_string(),
                access_token_minutes: 60,
                refresh_token_hours: 24,
                password_hash_rounds: 100_000,
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
            throttle: ThrottleConfig::with_rates(
                true,
                &[
                    (Scope::Anon, Rate::new(1000, Hour)),
                    (Scope::User, Rate::new(5000, Hour)),
                    (Scope::Login, Rate::new(20, Minute)),
                    (Scope::Registration, Rate::new(20, Hour)),
                    (Scope::Listing, Rate::new(1000, Hour)),
                    (Scope::ConsultaCreate, Rate::new(200, Hour)),
                    (Scope::ProfissionalCreate, Rate::new(100, Hour)),
                    (Scope::SensitiveData, Rate::new(300, Hour)),
                ],
            ),
        }
    }

    fn staging() -> Self {
        use Period::*;

        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 10,
            },
            api: ApiConfig {
                port: 8000,
                enable_request_logging: true,
                max_request_size_bytes: 1024 * 1024,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                access_token_minutes: 60,
                refresh_token_hours: 24,
                password_hash_rounds: 600_000,
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
            throttle: ThrottleConfig::with_rates(
                true,
                &[
                    (Scope::Anon, Rate::new(200, Hour)),
                    (Scope::User, Rate::new(2000, Hour)),
                    (Scope::Login, Rate::new(10, Minute)),
                    (Scope::Registration, Rate::new(10, Hour)),
                    (Scope::Listing, Rate::new(200, Hour)),
                    (Scope::ConsultaCreate, Rate::new(50, Hour)),
                    (Scope::ProfissionalCreate, Rate::new(20, Hour)),
                    (Scope::SensitiveData, Rate::new(60, Hour)),
                ],
            ),
        }
    }

    fn production() -> Self {
        use Period::*;

        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 5,
            },
            api: ApiConfig {
                port: 8000,
                enable_request_logging: false,
                max_request_size_bytes: 512 * 1024,
            },
            security: SecurityConfig {
                // Must come from SECURITY_JWT_SECRET
                jwt_secret: String::new(),
                access_token_minutes: 60,
                refresh_token_hours: 24,
                password_hash_rounds: 600_000,
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
            throttle: ThrottleConfig::with_rates(
                true,
                &[
                    (Scope::Anon, Rate::new(100, Hour)),
                    (Scope::User, Rate::new(1000, Hour)),
                    (Scope::Login, Rate::new(5, Minute)),
                    (Scope::Registration, Rate::new(3, Hour)),
                    (Scope::Listing, Rate::new(100, Hour)),
                    (Scope::ConsultaCreate, Rate::new(20, Hour)),
                    (Scope::ProfissionalCreate, Rate::new(10, Hour)),
                    (Scope::SensitiveData, Rate::new(30, Hour)),
                ],
            ),
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
