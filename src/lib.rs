pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use crate::app::auth::TokenService;
use crate::app::messages::MessageSettings;
use crate::config::rate_limits::RateLimits;
use crate::infra::{cache::RedisCache, store::Stores};

#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    /// Rate limiting is skipped when unset.
    pub cache: Option<RedisCache>,
    pub tokens: TokenService,
    pub messaging: MessageSettings,
    pub rate_limits: RateLimits,
    pub unread_poll_interval_seconds: u64,
    pub request_body_limit_bytes: usize,
}
