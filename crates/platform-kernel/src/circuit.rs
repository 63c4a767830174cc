//! Per-backend circuit breaker: a three-state machine
//! (Closed, Open, HalfOpen) guarding RPC fan-out. State is per-process —
//! consistency across gateway replicas is not required.

use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
    pub half_open_attempts: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
            half_open_attempts: 1,
        }
    }
}

struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    half_open_in_flight: u32,
}

/// Outcome of asking permission to make a call.
#[derive(Debug, PartialEq, Eq)]
pub enum Admission {
    /// Proceed with the call.
    Admit,
    /// Reject immediately; breaker is open.
    Reject,
}

pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                half_open_in_flight: 0,
            }),
        }
    }

    pub fn state(&self) -> CircuitState {
        let mut inner = self.inner.lock().unwrap();
        self.maybe_transition_to_half_open(&mut inner);
        inner.state
    }

    fn maybe_transition_to_half_open(&self, inner: &mut Inner) {
        if inner.state == CircuitState::Open {
            if let Some(opened_at) = inner.opened_at {
                if opened_at.elapsed() >= self.config.recovery_timeout {
                    inner.state = CircuitState::HalfOpen;
                    inner.half_open_in_flight = 0;
                }
            }
        }
    }

    /// Ask permission to make a call. Must be paired with exactly one of
    /// [`CircuitBreaker::on_success`] / [`CircuitBreaker::on_failure`] when
    /// admitted.
    pub fn try_acquire(&self) -> Admission {
        let mut inner = self.inner.lock().unwrap();
        self.maybe_transition_to_half_open(&mut inner);
        match inner.state {
            CircuitState::Closed => Admission::Admit,
            CircuitState::Open => Admission::Reject,
            CircuitState::HalfOpen => {
                if inner.half_open_in_flight < self.config.half_open_attempts {
                    inner.half_open_in_flight += 1;
                    Admission::Admit
                } else {
                    Admission::Reject
                }
            }
        }
    }

    pub fn on_success(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.consecutive_failures = 0;
        inner.state = CircuitState::Closed;
        inner.opened_at = None;
        inner.half_open_in_flight = 0;
    }

    pub fn on_failure(&self) {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                inner.half_open_in_flight = 0;
            }
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                }
            }
            CircuitState::Open => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker() -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 5,
            recovery_timeout: Duration::from_millis(20),
            half_open_attempts: 1,
        })
    }

    #[test]
    fn opens_after_consecutive_failure_threshold() {
        let cb = breaker();
        for _ in 0..4 {
            assert_eq!(cb.try_acquire(), Admission::Admit);
            cb.on_failure();
        }
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.try_acquire(), Admission::Admit);
        cb.on_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(cb.try_acquire(), Admission::Reject);
    }

    #[test]
    fn success_resets_consecutive_failures() {
        let cb = breaker();
        for _ in 0..4 {
            cb.try_acquire();
            cb.on_failure();
        }
        cb.try_acquire();
        cb.on_success();
        for _ in 0..4 {
            cb.try_acquire();
            cb.on_failure();
        }
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_probe_success_closes_breaker() {
        let cb = breaker();
        for _ in 0..5 {
            cb.try_acquire();
            cb.on_failure();
        }
        assert_eq!(cb.state(), CircuitState::Open);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert_eq!(cb.try_acquire(), Admission::Admit);
        cb.on_success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_probe_failure_reopens() {
        let cb = breaker();
        for _ in 0..5 {
            cb.try_acquire();
            cb.on_failure();
        }
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert_eq!(cb.try_acquire(), Admission::Admit);
        cb.on_failure();
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[test]
    fn half_open_limits_concurrent_probes() {
        let cb = breaker();
        for _ in 0..5 {
            cb.try_acquire();
            cb.on_failure();
        }
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(cb.try_acquire(), Admission::Admit);
        assert_eq!(cb.try_acquire(), Admission::Reject);
    }
}
