//! Fixed-window rate limiter, built directly on `CachePort::incr_with_ttl`
//! rather than a `tower` middleware crate: keying must switch from the
//! caller's IP to their resolved user identity once one is available, so
//! the limiter needs a call site downstream of identity resolution instead
//! of a blanket layer.

use std::sync::Arc;
use std::time::Duration;

use platform_cache::CachePort;
use platform_kernel::config::RateLimitConfig;
use tracing::warn;

pub const WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

pub struct RateLimiter {
    cache: Arc<dyn CachePort>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(cache: Arc<dyn CachePort>, config: RateLimitConfig) -> Self {
        Self { cache, config }
    }

    /// `key` is `ip:<addr>` for unauthenticated callers, `user:<user_id>`
    /// once identity is resolved. Cache errors fail open.
    pub async fn check(&self, key: &str) -> Decision {
        let limit = self.config.burst_size.unwrap_or(self.config.requests_per_minute);
        match self.cache.incr_with_ttl(&format!("ratelimit:{key}"), WINDOW).await {
            Ok(count) => {
                if count > limit as i64 {
                    Decision::Deny
                } else {
                    Decision::Allow
                }
            }
            Err(err) => {
                warn!(error = %err, key, "rate limit cache unavailable, failing open");
                Decision::Allow
            }
        }
    }
}
