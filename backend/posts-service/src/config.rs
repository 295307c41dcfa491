/// Configuration management for Posts Service
///
/// All settings come from environment variables (a `.env` file is loaded by
/// `main` through `dotenvy`). Production deployments refuse weak JWT secrets
/// and wildcard CORS origins.
use crypto_core::{generate_secret, validate_secret_strength, SecretStrength};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Storage backend selection
    pub store: StoreConfig,
    /// Session token signing
    pub jwt: JwtConfig,
    /// Address lookup
    pub geocoding: GeocodingConfig,
    /// Image uploads
    pub uploads: UploadConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.env.eq_ignore_ascii_case("production")
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins
    pub allowed_origins: String,
}

impl CorsConfig {
    pub fn origins(&self) -> impl Iterator<Item = &str> {
        self.allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
    }
}

/// Database configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL
    pub url: String,
    /// Max connections in pool
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection
    pub acquire_timeout_secs: u64,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!(
                "STORE_BACKEND must be 'postgres' or 'memory', got '{}'",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Upper bound for one create/delete transaction
    pub transaction_timeout_ms: u64,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    /// Without a key every lookup fails
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_ms: u64,
}

impl fmt::Debug for GeocodingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeocodingConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Directory images are written to
    pub dir: String,
    /// Largest accepted image, in bytes
    pub max_bytes: usize,
}

const DEV_JWT_SECRET_LENGTH: usize = 48;

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let production = app_env.eq_ignore_ascii_case("production");

        Ok(Config {
            app: AppConfig {
                env: app_env.clone(),
                host: std::env::var("POSTS_SERVICE_HOST")
                    .unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or_default("POSTS_SERVICE_PORT", 5000)?,
            },
            cors: {
                let allowed_origins = match std::env::var("CORS_ALLOWED_ORIGINS") {
                    Ok(value) => value,
                    Err(_) if production => {
                        return Err("CORS_ALLOWED_ORIGINS must be set in production".to_string())
                    }
                    Err(_) => "http://localhost:3000".to_string(),
                };

                if production && allowed_origins.trim() == "*" {
                    return Err("CORS_ALLOWED_ORIGINS cannot be '*' in production".to_string());
                }

                CorsConfig { allowed_origins }
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "postgresql://localhost/pinpoint".to_string()),
                max_connections: parse_env_or_default("DATABASE_MAX_CONNECTIONS", 10)?,
                acquire_timeout_secs: parse_env_or_default("DATABASE_ACQUIRE_TIMEOUT_SECS", 5)?,
            },
            store: StoreConfig {
                backend: std::env::var("STORE_BACKEND")
                    .unwrap_or_else(|_| "postgres".to_string())
                    .parse()?,
                transaction_timeout_ms: parse_env_or_default(
                    "STORE_TRANSACTION_TIMEOUT_MS",
                    5_000,
                )?,
            },
            jwt: {
                let secret = match std::env::var("JWT_SECRET") {
                    Ok(value) if !value.trim().is_empty() => value,
                    _ if production => {
                        return Err("JWT_SECRET must be set in production".to_string())
                    }
                    _ => {
                        tracing::warn!(
                            "JWT_SECRET not set, using a per-process secret; sessions end on restart"
                        );
                        generate_secret(DEV_JWT_SECRET_LENGTH)
                    }
                };

                if production && validate_secret_strength(&secret) == SecretStrength::Weak {
                    return Err(
                        "JWT_SECRET is too weak for production (need >= 32 random bytes)"
                            .to_string(),
                    );
                }

                JwtConfig { secret }
            },
            geocoding: GeocodingConfig {
                api_key: std::env::var("GOOGLE_API_KEY")
                    .ok()
                    .filter(|k| !k.trim().is_empty()),
                base_url: std::env::var("GEOCODING_BASE_URL").unwrap_or_else(|_| {
                    "https://maps.googleapis.com/maps/api/geocode/json".to_string()
                }),
                timeout_ms: parse_env_or_default("GEOCODING_TIMEOUT_MS", 3_000)?,
            },
            uploads: UploadConfig {
                dir: std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads/images".to_string()),
                max_bytes: parse_env_or_default("UPLOAD_MAX_BYTES", 500_000)?,
            },
        })
    }
}

fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, String>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .parse()
            .map_err(|e| format!("Failed to parse {}='{}': {}", key, val, e)),
        Err(_) => Ok(default),
    }
}
