/*
 * Responsibility
 * - 環境変数や設定の読み込み (port, DATABASE_URL, JWT 設定など)
 * - 設定値のバリデーション (不足なら起動失敗)
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use axum::http::HeaderName;
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::Duration;

/// HS256 needs at least 256 bits of key.
pub const MIN_SIGNING_KEY_BYTES: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        match std::env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Everything the token layer needs. Read-only after startup.
#[derive(Clone)]
pub struct JwtSettings {
    pub header_name: HeaderName,
    pub token_prefix: String,
    pub signing_key: Vec<u8>,
    pub payload_key: String,
    pub authorities_key: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print key material
        f.debug_struct("JwtSettings")
            .field("header_name", &self.header_name)
            .field("token_prefix", &self.token_prefix)
            .field("authorities_key", &self.authorities_key)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl JwtSettings {
    /// Checks shared by `from_env` and hand-built settings (tests).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.signing_key.len() < MIN_SIGNING_KEY_BYTES {
            return Err(ConfigError::Invalid("JWT_SIGNING_KEY"));
        }
        if self.payload_key.is_empty() {
            return Err(ConfigError::Invalid("JWT_PAYLOAD_KEY"));
        }
        if self.authorities_key.trim().is_empty() {
            return Err(ConfigError::Invalid("JWT_AUTHORITIES_KEY"));
        }
        if self.token_prefix.is_empty() {
            return Err(ConfigError::Invalid("JWT_TOKEN_PREFIX"));
        }
        if self.access_ttl <= Duration::zero() {
            return Err(ConfigError::Invalid("ACCESS_TOKEN_TTL_SECONDS"));
        }
        if self.refresh_ttl <= self.access_ttl {
            return Err(ConfigError::Invalid("REFRESH_TOKEN_TTL_SECONDS"));
        }
        Ok(())
    }

    fn from_env() -> Result<Self, ConfigError> {
        let header_name = std::env::var("JWT_HEADER_STRING")
            .unwrap_or_else(|_| "Authorization".to_string());
        let header_name = HeaderName::from_bytes(header_name.as_bytes())
            .map_err(|_| ConfigError::Invalid("JWT_HEADER_STRING"))?;

        let token_prefix =
            std::env::var("JWT_TOKEN_PREFIX").unwrap_or_else(|_| "Bearer ".to_string());

        // Base64 in the environment, raw bytes in memory.
        let signing_key = std::env::var("JWT_SIGNING_KEY")
            .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?;
        let signing_key = STANDARD
            .decode(signing_key.trim())
            .map_err(|_| ConfigError::Invalid("JWT_SIGNING_KEY"))?;

        let payload_key = std::env::var("JWT_PAYLOAD_KEY")
            .map_err(|_| ConfigError::Missing("JWT_PAYLOAD_KEY"))?;

        let authorities_key =
            std::env::var("JWT_AUTHORITIES_KEY").unwrap_or_else(|_| "roles".to_string());

        let access_ttl = ttl_from_env("ACCESS_TOKEN_TTL_SECONDS", 600)?; // 10 min
        let refresh_ttl = ttl_from_env("REFRESH_TOKEN_TTL_SECONDS", 2_592_000)?; // 30 days

        let settings = Self {
            header_name,
            token_prefix,
            signing_key,
            payload_key,
            authorities_key,
            access_ttl,
            refresh_ttl,
        };
        settings.validate()?;

        Ok(settings)
    }
}

fn ttl_from_env(key: &'static str, default_seconds: i64) -> Result<Duration, ConfigError> {
    let seconds = match std::env::var(key) {
        Ok(s) => s.parse::<i64>().map_err(|_| ConfigError::Invalid(key))?,
        Err(_) => default_seconds,
    };
    Duration::try_seconds(seconds).ok_or(ConfigError::Invalid(key))
}

/// One `username:password:ROLE_A|ROLE_B` entry of `SEED_USERS`.
#[derive(Clone, PartialEq, Eq)]
pub struct SeedUser {
    pub username: String,
    pub password: String,
    pub authorities: Vec<String>,
}

impl fmt::Debug for SeedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeedUser")
            .field("username", &self.username)
            .field("authorities", &self.authorities)
            .finish_non_exhaustive()
    }
}

pub fn parse_seed_users(raw: &str) -> Result<Vec<SeedUser>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| {
            let mut parts = entry.splitn(3, ':');
            let username = parts.next().unwrap_or_default().trim();
            let password = parts.next().unwrap_or_default();
            let roles = parts.next().unwrap_or_default();

            if username.is_empty() || password.is_empty() {
                return Err(ConfigError::Invalid("SEED_USERS"));
            }

            Ok(SeedUser {
                username: username.to_string(),
                password: password.to_string(),
                authorities: roles
                    .split('|')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(str::to_owned)
                    .collect(),
            })
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    // Postgres user directory when set, otherwise the seeded in-memory one.
    pub database_url: Option<String>,
    pub seed_users: Vec<SeedUser>,
    pub jwt: JwtSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = std::env::var("AUTH_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(4000);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("AUTH_PORT"))?;

        let app_env = AppEnv::from_env();

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let seed_users = parse_seed_users(&std::env::var("SEED_USERS").unwrap_or_default())?;

        let jwt = JwtSettings::from_env()?;

        Ok(Self {
            addr,
            app_env,
            database_url,
            seed_users,
            jwt,
        })
    }
}
