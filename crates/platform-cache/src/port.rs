use std::time::Duration;

use async_trait::async_trait;
use platform_kernel::AppError;

/// Shared cache contract used for the scheduler's distributed leases and
/// the gateway's rate-limit counters. Every
/// operation is a single atomic primitive so callers never need a
/// check-then-act race window across instances.
#[async_trait]
pub trait CachePort: Send + Sync {
    /// Atomically increments the counter at `key` and (re)sets its TTL in
    /// the same round trip, returning the value after the increment. Used
    /// by the fixed-window rate limiter.
    async fn incr_with_ttl(&self, key: &str, ttl: Duration) -> Result<i64, AppError>;

    /// Sets `key` to `value` only if it does not already exist, with the
    /// given TTL. Returns `true` if the key was set (lease acquired).
    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, AppError>;

    /// Deletes `key` only if its current value equals `expected` (a
    /// compare-and-delete used to release a lease only by its owner).
    /// Returns `true` if the key was deleted.
    async fn del_if_match(&self, key: &str, expected: &str) -> Result<bool, AppError>;

    async fn get(&self, key: &str) -> Result<Option<String>, AppError>;
}
