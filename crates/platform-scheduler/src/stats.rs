use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Lifecycle states of the scheduler: `Start`/`Stop` are
/// the only transitions, and re-entering `Start` while `Running` is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopping,
}

impl From<u8> for SchedulerState {
    fn from(value: u8) -> Self {
        match value {
            1 => SchedulerState::Running,
            2 => SchedulerState::Stopping,
            _ => SchedulerState::Idle,
        }
    }
}

impl From<SchedulerState> for u8 {
    fn from(value: SchedulerState) -> Self {
        match value {
            SchedulerState::Idle => 0,
            SchedulerState::Running => 1,
            SchedulerState::Stopping => 2,
        }
    }
}

/// A point-in-time snapshot returned by `Stats()`.
#[derive(Debug, Clone)]
pub struct SchedulerStats {
    pub running: bool,
    pub in_flight: i64,
    pub queued: i64,
    pub last_tick_at: Option<DateTime<Utc>>,
    pub successes: u64,
    pub failures: u64,
    pub timeouts: u64,
}

/// Shared, lock-free counters backing `Stats()`. Cloned cheaply via `Arc`
/// into the tick loop and every worker.
#[derive(Clone)]
pub struct StatsTracker {
    inner: Arc<Inner>,
}

struct Inner {
    state: std::sync::atomic::AtomicU8,
    in_flight: AtomicI64,
    queued: AtomicI64,
    last_tick_micros: AtomicI64,
    successes: AtomicU64,
    failures: AtomicU64,
    timeouts: AtomicU64,
}

impl Default for StatsTracker {
    fn default() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: std::sync::atomic::AtomicU8::new(SchedulerState::Idle.into()),
                in_flight: AtomicI64::new(0),
                queued: AtomicI64::new(0),
                last_tick_micros: AtomicI64::new(0),
                successes: AtomicU64::new(0),
                failures: AtomicU64::new(0),
                timeouts: AtomicU64::new(0),
            }),
        }
    }
}

impl StatsTracker {
    pub fn state(&self) -> SchedulerState {
        self.inner.state.load(Ordering::SeqCst).into()
    }

    pub fn set_state(&self, state: SchedulerState) {
        self.inner.state.store(state.into(), Ordering::SeqCst);
    }

    pub fn record_tick(&self, at: DateTime<Utc>) {
        self.inner.last_tick_micros.store(at.timestamp_micros(), Ordering::SeqCst);
    }

    pub fn enqueue(&self) {
        self.inner.queued.fetch_add(1, Ordering::SeqCst);
    }

    /// Undoes a prior `enqueue()` when the task never actually started
    /// (worker pool saturated, so the lease is released instead).
    pub fn cancel_enqueue(&self) {
        self.inner.queued.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn dequeue_into_flight(&self) {
        self.inner.queued.fetch_sub(1, Ordering::SeqCst);
        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
    }

    pub fn finish(&self, outcome: TaskOutcome) {
        self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
        match outcome {
            TaskOutcome::Success => self.inner.successes.fetch_add(1, Ordering::SeqCst),
            TaskOutcome::Failure => self.inner.failures.fetch_add(1, Ordering::SeqCst),
            TaskOutcome::Timeout => self.inner.timeouts.fetch_add(1, Ordering::SeqCst),
        };
    }

    pub fn in_flight(&self) -> i64 {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    pub fn queued(&self) -> i64 {
        self.inner.queued.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> SchedulerStats {
        let micros = self.inner.last_tick_micros.load(Ordering::SeqCst);
        SchedulerStats {
            running: self.state() == SchedulerState::Running,
            in_flight: self.inner.in_flight.load(Ordering::SeqCst),
            queued: self.inner.queued.load(Ordering::SeqCst),
            last_tick_at: (micros != 0).then(|| DateTime::from_timestamp_micros(micros).unwrap_or_else(Utc::now)),
            successes: self.inner.successes.load(Ordering::SeqCst),
            failures: self.inner.failures.load(Ordering::SeqCst),
            timeouts: self.inner.timeouts.load(Ordering::SeqCst),
        }
    }
}

pub enum TaskOutcome {
    Success,
    Failure,
    Timeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle_with_zeroed_counters() {
        let tracker = StatsTracker::default();
        let snapshot = tracker.snapshot();
        assert!(!snapshot.running);
        assert_eq!(snapshot.in_flight, 0);
        assert!(snapshot.last_tick_at.is_none());
    }

    #[test]
    fn transitions_and_counts_are_observable() {
        let tracker = StatsTracker::default();
        tracker.set_state(SchedulerState::Running);
        tracker.enqueue();
        tracker.dequeue_into_flight();
        tracker.finish(TaskOutcome::Success);
        let snapshot = tracker.snapshot();
        assert!(snapshot.running);
        assert_eq!(snapshot.queued, 0);
        assert_eq!(snapshot.in_flight, 0);
        assert_eq!(snapshot.successes, 1);
    }
}
