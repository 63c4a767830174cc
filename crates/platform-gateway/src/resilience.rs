//! RPC fan-out interceptor chain: context injection is
//! handled by the caller building a `RequestContext` before invoking
//! [`call_with_resilience`]; this module covers retry-with-backoff and the
//! per-backend circuit breaker wrapping every downstream call.

use std::time::Duration;

use platform_kernel::circuit::{Admission, CircuitBreaker, CircuitBreakerConfig};
use platform_kernel::config::ResilienceConfig;
use platform_kernel::{AppError, RetryPolicy};
use std::future::Future;
use tracing::warn;

/// One breaker per backend service name.
pub struct Backend {
    name: &'static str,
    breaker: CircuitBreaker,
    max_retries: u32,
    retry_policy: RetryPolicy,
}

impl Backend {
    pub fn new(name: &'static str, config: &ResilienceConfig) -> Self {
        Self {
            name,
            breaker: CircuitBreaker::new(CircuitBreakerConfig {
                failure_threshold: config.failure_threshold,
                recovery_timeout: Duration::from_secs(config.recovery_timeout_seconds),
                half_open_attempts: config.half_open_attempts,
            }),
            max_retries: config.max_retries,
            retry_policy: RetryPolicy::ExponentialJitter,
        }
    }

    /// Invokes `call` under the breaker, retrying transient failures up to
    /// `max_retries` times with backoff. Rejects immediately with
    /// `unavailable` when the breaker is open.
    pub async fn call<T, F, Fut>(&self, call: F) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        self.call_with_deadline(call, Duration::from_secs(3600)).await
    }

    /// Same as [`Backend::call`], but every attempt is additionally bounded
    /// by `deadline`, the caller's remaining request budget.
    /// A timed-out attempt surfaces as `ErrorKind::Timeout`, which the retry
    /// loop below treats as transient.
    pub async fn call_with_deadline<T, F, Fut>(&self, mut call: F, deadline: Duration) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let mut attempt = 0;
        loop {
            match self.breaker.try_acquire() {
                Admission::Reject => {
                    return Err(AppError::unavailable(format!("{} is unavailable (circuit open)", self.name)));
                }
                Admission::Admit => {}
            }

            let result = match tokio::time::timeout(deadline, call()).await {
                Ok(result) => result,
                Err(_) => Err(AppError::timeout(format!("{} call exceeded request deadline", self.name))),
            };
            match &result {
                Ok(_) => {
                    self.breaker.on_success();
                    return result;
                }
                Err(err) if err.kind.is_transient() && attempt < self.max_retries => {
                    self.breaker.on_failure();
                    attempt += 1;
                    let delay = self.retry_policy.backoff(attempt, Duration::from_millis(50));
                    warn!(backend = self.name, attempt, kind = ?err.kind, "retrying transient rpc failure");
                    tokio::time::sleep(delay).await;
                }
                Err(_) => {
                    self.breaker.on_failure();
                    return result;
                }
            }
        }
    }
}
