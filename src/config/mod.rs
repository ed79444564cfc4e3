pub mod rate_limits;

use anyhow::{anyhow, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::config::rate_limits::RateLimits;
use crate::domain::message::ModerationPolicy;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppMode {
    Api,
    Migrate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub http_addr: String,
    pub app_mode: AppMode,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_connect_timeout_seconds: u64,
    pub db_idle_timeout_seconds: u64,
    pub db_max_lifetime_seconds: u64,
    pub db_migrations_dir: String,
    pub redis_url: Option<String>,
    pub paseto_access_key: [u8; 32],
    pub token_issuer: String,
    pub moderation_policy: ModerationPolicy,
    pub message_max_chars: usize,
    pub message_max_attachments: usize,
    pub unread_poll_interval_seconds: u64,
    pub request_body_limit_bytes: usize,
    pub rate_limits: RateLimits,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let http_addr = env.or("HTTP_ADDR", "0.0.0.0:8080");
        let _parsed_http_addr = SocketAddr::from_str(&http_addr)
            .map_err(|err| anyhow!("invalid HTTP_ADDR: {}", err))?;

        let app_mode = match env.or("APP_MODE", "api").as_str() {
            "api" => AppMode::Api,
            "migrate" => AppMode::Migrate,
            other => return Err(anyhow!("unknown APP_MODE: {}", other)),
        };

        let store_backend = match env.or("STORE_BACKEND", "postgres").as_str() {
            "postgres" => StoreBackend::Postgres,
            "memory" => StoreBackend::Memory,
            other => return Err(anyhow!("unknown STORE_BACKEND: {}", other)),
        };

        let database_url = env.get("DATABASE_URL");
        if database_url.is_none()
            && (store_backend == StoreBackend::Postgres || app_mode == AppMode::Migrate)
        {
            return Err(anyhow!("missing required env var: DATABASE_URL"));
        }

        let moderation_policy = env.or("MODERATION_POLICY", "none");
        let moderation_policy = ModerationPolicy::from_config(&moderation_policy)
            .ok_or_else(|| anyhow!("invalid MODERATION_POLICY: {}", moderation_policy))?;

        let unread_poll_interval_seconds: u64 = env.parse("UNREAD_POLL_INTERVAL_SECONDS", "30")?;
        if unread_poll_interval_seconds == 0 {
            return Err(anyhow!("invalid UNREAD_POLL_INTERVAL_SECONDS: must be positive"));
        }

        Ok(Self {
            http_addr,
            app_mode,
            store_backend,
            database_url,
            db_max_connections: env.parse("DB_MAX_CONNECTIONS", "25")?,
            db_connect_timeout_seconds: env.parse("DB_CONNECT_TIMEOUT_SECONDS", "5")?,
            db_idle_timeout_seconds: env.parse("DB_IDLE_TIMEOUT_SECONDS", "300")?,
            db_max_lifetime_seconds: env.parse("DB_MAX_LIFETIME_SECONDS", "1800")?,
            db_migrations_dir: env.or("DB_MIGRATIONS_DIR", "migrations"),
            redis_url: env.get("REDIS_URL"),
            paseto_access_key: env.key_32("PASETO_ACCESS_KEY")?,
            token_issuer: env.or("TOKEN_ISSUER", "penpal"),
            moderation_policy,
            message_max_chars: env.parse("MESSAGE_MAX_CHARS", "5000")?,
            message_max_attachments: env.parse("MESSAGE_MAX_ATTACHMENTS", "5")?,
            unread_poll_interval_seconds,
            request_body_limit_bytes: env.parse("REQUEST_BODY_LIMIT_BYTES", "65536")?,
            rate_limits: RateLimits {
                messages_per_hour: env.parse("RATE_MESSAGES_PER_HOUR", "60")?,
                messages_per_day: env.parse("RATE_MESSAGES_PER_DAY", "300")?,
                match_requests_per_day: env.parse("RATE_MATCH_REQUESTS_PER_DAY", "20")?,
            },
        })
    }
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|value| !value.is_empty())
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn or_err(&self, key: &str) -> Result<String> {
        self.get(key)
            .ok_or_else(|| anyhow!("missing required env var: {}", key))
    }

    fn parse<T>(&self, key: &str, default: &str) -> Result<T>
    where
        T: FromStr,
        <T as FromStr>::Err: std::fmt::Display,
    {
        self.or(key, default)
            .parse::<T>()
            .map_err(|err| anyhow!("invalid {}: {}", key, err))
    }

    fn key_32(&self, key: &str) -> Result<[u8; 32]> {
        let value = self.or_err(key)?;
        let decoded = STANDARD
            .decode(value.as_bytes())
            .map_err(|err| anyhow!("invalid {}: {}", key, err))?;
        if decoded.len() != 32 {
            return Err(anyhow!("invalid {}: expected 32 bytes", key));
        }
        let mut key_bytes = [0u8; 32];
        key_bytes.copy_from_slice(&decoded);
        Ok(key_bytes)
    }
}
