//! Per-user fixed-window rate limiting over an injected bounded cache.

use crate::{
    cache::{BoundedCache, LruBoundedCache},
    config::RateLimitConfig,
    error::{DisputeError, DisputeResult},
    types::UserId,
};
use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindow {
    pub started_at: DateTime<Utc>,
    pub calls: u32,
}

pub struct RateLimiter {
    cache: Box<dyn BoundedCache<UserId, RateWindow>>,
    max_calls: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(cache: Box<dyn BoundedCache<UserId, RateWindow>>, max_calls: u32, window: Duration) -> Self {
        Self { cache, max_calls, window }
    }

    /// LRU-backed limiter sized from config.
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            Box::new(LruBoundedCache::new(config.cache_capacity)),
            config.max_calls,
            Duration::seconds(config.window_secs),
        )
    }

    /// Count one call for `user_id` at `now`, refusing it once the window is full.
    pub fn check(&mut self, user_id: &str, now: DateTime<Utc>) -> DisputeResult<()> {
        let key = user_id.to_string();
        let current = match self.cache.get(&key) {
            Some(w) if now - w.started_at < self.window => *w,
            _ => RateWindow { started_at: now, calls: 0 },
        };

        if current.calls >= self.max_calls {
            let retry_after = (current.started_at + self.window - now).num_seconds().max(1);
            log::warn!("user={user_id} rate_limit: refused, retry in {retry_after}s");
            return Err(DisputeError::RateLimited {
                user_id: key,
                retry_after_secs: retry_after,
            });
        }

        let next = RateWindow { calls: current.calls + 1, ..current };
        if let Some((evicted, _)) = self.cache.put(key, next) {
            log::debug!("rate_limit: evicted window for user={evicted}");
        }
        Ok(())
    }

    pub fn tracked_users(&self) -> usize {
        self.cache.len()
    }
}
