//! Retry backoff policies for the gateway's RPC fan-out: transient status codes are retried up to `max_retries` with a
//! backoff chosen from {linear, exponential, exponential+jitter}.

use std::time::Duration;

use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryPolicy {
    Linear,
    Exponential,
    ExponentialJitter,
}

impl RetryPolicy {
    /// Backoff delay before retry attempt number `attempt` (1-indexed: the
    /// delay before the *second* overall try is `backoff(1)`).
    pub fn backoff(self, attempt: u32, base: Duration) -> Duration {
        let attempt = attempt.max(1);
        match self {
            RetryPolicy::Linear => base * attempt,
            RetryPolicy::Exponential => base * 2u32.saturating_pow(attempt - 1),
            RetryPolicy::ExponentialJitter => {
                let exp = base * 2u32.saturating_pow(attempt - 1);
                let jitter_ms = rand::thread_rng().gen_range(0..=exp.as_millis().max(1) as u64);
                Duration::from_millis(jitter_ms)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_backoff_scales_with_attempt() {
        let base = Duration::from_millis(100);
        assert_eq!(RetryPolicy::Linear.backoff(1, base), Duration::from_millis(100));
        assert_eq!(RetryPolicy::Linear.backoff(3, base), Duration::from_millis(300));
    }

    #[test]
    fn exponential_backoff_doubles() {
        let base = Duration::from_millis(100);
        assert_eq!(RetryPolicy::Exponential.backoff(1, base), Duration::from_millis(100));
        assert_eq!(RetryPolicy::Exponential.backoff(2, base), Duration::from_millis(200));
        assert_eq!(RetryPolicy::Exponential.backoff(3, base), Duration::from_millis(400));
    }

    #[test]
    fn jitter_backoff_never_exceeds_exponential_ceiling() {
        let base = Duration::from_millis(100);
        for attempt in 1..=4 {
            let ceiling = base * 2u32.pow(attempt - 1);
            let sample = RetryPolicy::ExponentialJitter.backoff(attempt, base);
            assert!(sample <= ceiling);
        }
    }
}
