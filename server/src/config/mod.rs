use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use thiserror::Error;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::with_security_headers;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/events";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3001";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;
const DEFAULT_BCRYPT_COST: u32 = 10;
const DEFAULT_EVENT_CAPACITY: i32 = 100;
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";
const DEV_JWT_SECRET: &str = "development-secret-do-not-use-in-production";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set when RUST_ENV=production")]
    MissingJwtSecret,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub max_connections: u32,
    pub jwt_secret: String,
    pub token_ttl_secs: i64,
    pub bcrypt_cost: u32,
    /// Capacity assigned to every newly created event.
    pub default_event_capacity: i32,
    pub cors_allowed_origins: Vec<String>,
    pub production: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Unset or unparsable values fall back to defaults, except the token
    /// secret, which production requires.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let production = lookup("RUST_ENV")
            .map(|v| v.to_lowercase() == "production")
            .unwrap_or(false);

        let jwt_secret = match lookup("JWT_SECRET") {
            Some(secret) if !secret.trim().is_empty() => secret,
            _ if production => return Err(ConfigError::MissingJwtSecret),
            _ => {
                tracing::warn!("JWT_SECRET not set, falling back to the development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect();

        Ok(Self {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            bind_addr: parse_or(&lookup, "BIND_ADDR", || {
                DEFAULT_BIND_ADDR
                    .parse()
                    .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 3001)))
            }),
            max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", || {
                DEFAULT_MAX_CONNECTIONS
            }),
            jwt_secret,
            token_ttl_secs: parse_or(&lookup, "TOKEN_TTL_SECS", || DEFAULT_TOKEN_TTL_SECS),
            bcrypt_cost: parse_or(&lookup, "BCRYPT_COST", || DEFAULT_BCRYPT_COST),
            default_event_capacity: parse_or(&lookup, "DEFAULT_EVENT_CAPACITY", || {
                DEFAULT_EVENT_CAPACITY
            }),
            cors_allowed_origins,
            production,
        })
    }
}

fn parse_or<F, T, D>(lookup: &F, key: &str, default: D) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    D: FnOnce() -> T,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Config: invalid value '{}' for {}, using default", raw, key);
                default()
            }
        },
        None => default(),
    }
}
