use std::sync::Arc;
use std::time::Duration;

use platform_cache::CachePort;
use platform_kernel::AppError;
use uuid::Uuid;

/// A short-lived distributed lock over `lock:check:<id>`, giving at-most-one
/// dispatch per check across all scheduler replicas on a given tick.
pub struct Lease {
    cache: Arc<dyn CachePort>,
    key: String,
    token: String,
}

impl Lease {
    /// Attempts to acquire the lease for `check_id`. Failure to acquire is
    /// not an error: it means another replica already owns this tick.
    pub async fn acquire(
        cache: Arc<dyn CachePort>,
        check_id: Uuid,
        ttl: Duration,
    ) -> Result<Option<Self>, AppError> {
        let key = format!("lock:check:{check_id}");
        let token = Uuid::new_v4().to_string();
        let acquired = cache.set_nx_ex(&key, &token, ttl).await?;
        Ok(acquired.then_some(Self { cache, key, token }))
    }

    /// Releases the lease, but only if it is still owned by this holder.
    /// Called in every exit path of the worker (success, error, timeout).
    pub async fn release(self) {
        if let Err(err) = self.cache.del_if_match(&self.key, &self.token).await {
            tracing::warn!(key = %self.key, error = %err, "failed to release scheduler lease");
        }
    }
}

/// TTL for a check's lease: at least long enough to cover the probe timeout,
/// floored by the configured minimum lock duration.
pub fn lease_ttl(timeout_seconds: i64, lock_timeout_seconds: u64) -> Duration {
    Duration::from_secs(timeout_seconds.max(0) as u64).max(Duration::from_secs(lock_timeout_seconds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform_cache::InMemoryCache;

    #[tokio::test]
    async fn second_acquire_fails_while_first_holds_lease() {
        let cache: Arc<dyn CachePort> = Arc::new(InMemoryCache::new());
        let check_id = Uuid::new_v4();
        let first = Lease::acquire(cache.clone(), check_id, Duration::from_secs(30)).await.unwrap();
        assert!(first.is_some());
        let second = Lease::acquire(cache.clone(), check_id, Duration::from_secs(30)).await.unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn lease_can_be_reacquired_after_release() {
        let cache: Arc<dyn CachePort> = Arc::new(InMemoryCache::new());
        let check_id = Uuid::new_v4();
        let first = Lease::acquire(cache.clone(), check_id, Duration::from_secs(30)).await.unwrap().unwrap();
        first.release().await;
        let second = Lease::acquire(cache.clone(), check_id, Duration::from_secs(30)).await.unwrap();
        assert!(second.is_some());
    }

    #[test]
    fn ttl_uses_the_larger_of_timeout_and_lock_minimum() {
        assert_eq!(lease_ttl(5, 30), Duration::from_secs(30));
        assert_eq!(lease_ttl(120, 30), Duration::from_secs(120));
    }
}
