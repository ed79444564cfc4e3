use anyhow::Result;
use redis::AsyncCommands;
use uuid::Uuid;

use crate::config::rate_limits::{current_window, RateAction, RateLimits};
use crate::infra::cache::RedisCache;

pub struct RateLimitInfo {
    pub limited: bool,
    pub limit: u32,
    pub remaining: u32,
}

#[derive(Clone)]
pub struct RateLimiter {
    cache: RedisCache,
    limits: RateLimits,
}

impl RateLimiter {
    pub fn new(cache: RedisCache, limits: RateLimits) -> Self {
        Self { cache, limits }
    }

    /// Counts one attempt of `action` in every applicable window and reports
    /// whether any window is now over its limit.
    pub async fn hit(&self, user_id: Uuid, action: RateAction) -> Result<RateLimitInfo> {
        let mut conn = self.cache.client().get_multiplexed_async_connection().await?;

        // Track the tightest (most constrained) window for response headers
        let mut min_remaining = u32::MAX;
        let mut effective_limit: u32 = 0;

        for (limit, window) in self.limits.windows_for(action) {
            let window_seconds = window.seconds();
            let key = format!(
                "ratelimit:{}:{}:{}",
                user_id,
                action.as_str(),
                current_window(window_seconds)
            );

            // INCR is atomic, so concurrent requests never share a count.
            let count: u32 = conn.incr(&key, 1).await?;
            if count == 1 {
                let _: () = conn.expire(&key, window_seconds as i64).await?;
            }

            if count > limit {
                tracing::debug!(
                    user_id = %user_id,
                    action = action.as_str(),
                    window = ?window,
                    count = count,
                    limit = limit,
                    "Rate limit exceeded"
                );
                return Ok(RateLimitInfo {
                    limited: true,
                    limit,
                    remaining: 0,
                });
            }

            let remaining = limit - count;
            if remaining < min_remaining {
                min_remaining = remaining;
                effective_limit = limit;
            }
        }

        Ok(RateLimitInfo {
            limited: false,
            limit: effective_limit,
            remaining: min_remaining,
        })
    }
}
