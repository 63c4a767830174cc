use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use platform_cache::CachePort;
use platform_executor::CoreService;
use platform_incidents::IncidentService;
use platform_kernel::config::SchedulerConfig;
use platform_kernel::{AppError, Clock};
use platform_models::{Check, CheckResult, Schedule};
use platform_persistence::PersistencePort;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::lease::{lease_ttl, Lease};
use crate::next_run::compute_next_run;
use crate::stats::{SchedulerStats, SchedulerState, StatsTracker, TaskOutcome};

/// Outcome of a `Stop()` call: whether every in-flight task drained before
/// the deadline, and how many did not.
#[derive(Debug, Clone)]
pub struct DrainReport {
    pub drained: bool,
    pub undrained_in_flight: i64,
}

/// Public contract for the distributed scheduler.
#[async_trait]
pub trait SchedulerService: Send + Sync {
    async fn start(&self) -> Result<(), AppError>;
    async fn stop(&self, drain_deadline: Duration) -> Result<DrainReport, AppError>;
    async fn execute_task(&self, tenant_id: Uuid, check_id: Uuid) -> Result<(), AppError>;
    fn stats(&self) -> SchedulerStats;
}

struct Inner {
    persistence: Arc<dyn PersistencePort>,
    cache: Arc<dyn CachePort>,
    core: Arc<dyn CoreService>,
    incidents: Arc<dyn IncidentService>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
    stats: StatsTracker,
    semaphore: Arc<Semaphore>,
    shutdown: AtomicBool,
    tick_handle: Mutex<Option<JoinHandle<()>>>,
}

pub struct DefaultScheduler {
    inner: Arc<Inner>,
}

impl DefaultScheduler {
    pub fn new(
        persistence: Arc<dyn PersistencePort>,
        cache: Arc<dyn CachePort>,
        core: Arc<dyn CoreService>,
        incidents: Arc<dyn IncidentService>,
        clock: Arc<dyn Clock>,
        config: SchedulerConfig,
    ) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_tasks));
        Self {
            inner: Arc::new(Inner {
                persistence,
                cache,
                core,
                incidents,
                clock,
                config,
                stats: StatsTracker::default(),
                semaphore,
                shutdown: AtomicBool::new(false),
                tick_handle: Mutex::new(None),
            }),
        }
    }
}

#[async_trait]
impl SchedulerService for DefaultScheduler {
    async fn start(&self) -> Result<(), AppError> {
        if self.inner.stats.state() == SchedulerState::Running {
            return Ok(());
        }
        self.inner.shutdown.store(false, Ordering::SeqCst);
        self.inner.stats.set_state(SchedulerState::Running);
        let inner = self.inner.clone();
        let handle = tokio::spawn(async move { run_tick_loop(inner).await });
        *self.inner.tick_handle.lock().unwrap_or_else(|p| p.into_inner()) = Some(handle);
        tracing::info!(
            tick_seconds = self.inner.config.tick_seconds,
            max_concurrent_tasks = self.inner.config.max_concurrent_tasks,
            "scheduler started"
        );
        Ok(())
    }

    async fn stop(&self, drain_deadline: Duration) -> Result<DrainReport, AppError> {
        if self.inner.stats.state() != SchedulerState::Running {
            return Ok(DrainReport { drained: true, undrained_in_flight: 0 });
        }
        self.inner.stats.set_state(SchedulerState::Stopping);
        self.inner.shutdown.store(true, Ordering::SeqCst);

        let handle = self.inner.tick_handle.lock().unwrap_or_else(|p| p.into_inner()).take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }

        let start = Instant::now();
        while self.inner.stats.in_flight() > 0 && start.elapsed() < drain_deadline {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        let undrained = self.inner.stats.in_flight();
        self.inner.stats.set_state(SchedulerState::Idle);
        if undrained > 0 {
            tracing::warn!(undrained, "scheduler stopped with tasks still in flight");
        }
        Ok(DrainReport { drained: undrained == 0, undrained_in_flight: undrained })
    }

    async fn execute_task(&self, tenant_id: Uuid, check_id: Uuid) -> Result<(), AppError> {
        let check = self
            .inner
            .persistence
            .get_check(tenant_id, check_id)
            .await?
            .ok_or_else(|| AppError::not_found("check not found"))?;
        let schedule = self.inner.persistence.get_schedule_for_check(tenant_id, check_id).await?;

        let ttl = lease_ttl(check.timeout_seconds, self.inner.config.lock_timeout_seconds);
        let lease = Lease::acquire(self.inner.cache.clone(), check_id, ttl)
            .await?
            .ok_or_else(|| AppError::conflict("check is already executing"))?;

        let permit = self
            .inner
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(AppError::internal)?;

        self.inner.stats.enqueue();
        dispatch(self.inner.clone(), check, schedule, lease, permit).await;
        Ok(())
    }

    fn stats(&self) -> SchedulerStats {
        self.inner.stats.snapshot()
    }
}

async fn run_tick_loop(inner: Arc<Inner>) {
    let tick = Duration::from_secs(inner.config.tick_seconds.max(1));
    loop {
        if inner.shutdown.load(Ordering::SeqCst) {
            break;
        }
        tokio::time::sleep(tick).await;
        if inner.shutdown.load(Ordering::SeqCst) {
            break;
        }
        run_one_tick(&inner).await;
    }
    tracing::info!("scheduler tick loop stopped");
}

async fn run_one_tick(inner: &Arc<Inner>) {
    let now = inner.clock.now();
    inner.stats.record_tick(now);

    let due = match inner.persistence.list_due_checks(now, inner.config.queue_capacity as i64).await {
        Ok(due) => due,
        Err(err) => {
            tracing::error!(error = %err, "failed to list due checks; will retry next tick");
            return;
        }
    };

    for check in due {
        if inner.stats.queued() + inner.stats.in_flight() >= inner.config.queue_capacity as i64 {
            tracing::debug!("scheduler queue at capacity; deferring remaining candidates to next tick");
            break;
        }

        let ttl = lease_ttl(check.timeout_seconds, inner.config.lock_timeout_seconds);
        let lease = match Lease::acquire(inner.cache.clone(), check.id, ttl).await {
            Ok(Some(lease)) => lease,
            Ok(None) => continue, // another replica owns this tick
            Err(err) => {
                tracing::warn!(check_id = %check.id, error = %err, "lease acquisition failed");
                continue;
            }
        };

        let schedule = match inner.persistence.get_schedule_for_check(check.tenant_id, check.id).await {
            Ok(schedule) => schedule,
            Err(err) => {
                tracing::warn!(check_id = %check.id, error = %err, "failed to load schedule");
                lease.release().await;
                continue;
            }
        };

        inner.stats.enqueue();
        match inner.semaphore.clone().try_acquire_owned() {
            Ok(permit) => {
                let inner = inner.clone();
                tokio::spawn(async move { dispatch(inner, check, schedule, lease, permit).await });
            }
            Err(_) => {
                inner.stats.cancel_enqueue();
                lease.release().await;
                tracing::debug!("worker pool saturated; deferring to next tick");
                break;
            }
        }
    }
}

async fn dispatch(
    inner: Arc<Inner>,
    check: Check,
    schedule: Option<Schedule>,
    lease: Lease,
    _permit: OwnedSemaphorePermit,
) {
    inner.stats.dequeue_into_flight();

    let timeout = Duration::from_secs(check.timeout_seconds.max(1) as u64);
    let started_at = inner.clock.now();
    let outcome = tokio::time::timeout(
        timeout,
        inner.core.execute(check.id, check.tenant_id, check.check_type, &check.target, timeout),
    )
    .await;
    let finished_at = inner.clock.now();

    let (task_outcome, check_result) = match outcome {
        Ok(Ok(result)) => {
            let task_outcome = if result.is_success { TaskOutcome::Success } else { TaskOutcome::Failure };
            (task_outcome, result)
        }
        Ok(Err(err)) => {
            tracing::warn!(check_id = %check.id, error = %err, "check execution errored");
            let elapsed = (finished_at - started_at).to_std().unwrap_or_default();
            (TaskOutcome::Failure, CheckResult::failure(check.id, check.tenant_id, err.safe_message().to_string(), elapsed, finished_at))
        }
        Err(_) => {
            (TaskOutcome::Timeout, CheckResult::failure(check.id, check.tenant_id, "timeout", timeout, finished_at))
        }
    };

    if let Err(err) = inner.persistence.record_check_result(check_result.clone()).await {
        tracing::warn!(check_id = %check.id, error = %err, "failed to record check result history");
    }

    if let Err(err) = inner.incidents.ingest(check_result).await {
        tracing::error!(check_id = %check.id, error = %err, "failed to ingest check result");
    }

    let next_run = compute_next_run(&check, schedule.as_ref(), finished_at);
    if let Err(err) = inner.persistence.mark_check_dispatched(check.id, finished_at, next_run).await {
        tracing::warn!(check_id = %check.id, error = %err, "failed to persist next_run_at; next tick will recompute");
    }

    inner.stats.finish(task_outcome);
    lease.release().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use platform_cache::InMemoryCache;
    use platform_incidents::{DefaultIncidentService, SeverityPolicy};
    use platform_kernel::{FakeClock, UuidGenerator};
    use platform_models::{CheckStatus, CheckType};
    use platform_persistence::InMemoryPersistence;

    fn config() -> SchedulerConfig {
        SchedulerConfig {
            tick_seconds: 1,
            max_concurrent_tasks: 4,
            lock_timeout_seconds: 30,
            queue_capacity: 16,
        }
    }

    fn scheduler(
        persistence: Arc<dyn PersistencePort>,
        clock: Arc<FakeClock>,
    ) -> DefaultScheduler {
        let cache: Arc<dyn CachePort> = Arc::new(InMemoryCache::new());
        let core: Arc<dyn CoreService> = Arc::new(platform_executor::DefaultCoreService::new(clock.clone()));
        let incidents: Arc<dyn IncidentService> = Arc::new(DefaultIncidentService::new(
            persistence.clone(),
            clock.clone(),
            Arc::new(UuidGenerator),
            SeverityPolicy::default(),
            chrono::Duration::seconds(30),
            chrono::Duration::minutes(10),
        ));
        DefaultScheduler::new(persistence, cache, core, incidents, clock, config())
    }

    fn seed_check(persistence: &Arc<dyn PersistencePort>, tenant_id: Uuid) -> Check {
        Check {
            id: Uuid::new_v4(),
            tenant_id,
            name: "localhost".into(),
            check_type: CheckType::Tcp,
            target: "127.0.0.1:1".into(),
            interval_seconds: 60,
            timeout_seconds: 5,
            status: CheckStatus::Active,
            priority: 1,
            last_run_at: None,
            next_run_at: None,
        }
    }

    #[tokio::test]
    async fn start_is_idempotent_while_running() {
        let persistence: Arc<dyn PersistencePort> = Arc::new(InMemoryPersistence::new());
        let clock = Arc::new(FakeClock::new(Utc::now()));
        let svc = scheduler(persistence, clock);
        svc.start().await.unwrap();
        svc.start().await.unwrap();
        assert!(svc.stats().running);
        svc.stop(Duration::from_secs(1)).await.unwrap();
    }

    #[tokio::test]
    async fn stop_transitions_back_to_idle() {
        let persistence: Arc<dyn PersistencePort> = Arc::new(InMemoryPersistence::new());
        let clock = Arc::new(FakeClock::new(Utc::now()));
        let svc = scheduler(persistence, clock);
        svc.start().await.unwrap();
        let report = svc.stop(Duration::from_secs(1)).await.unwrap();
        assert!(report.drained);
        assert!(!svc.stats().running);
    }

    #[tokio::test]
    async fn execute_task_dispatches_and_records_failure() {
        let persistence: Arc<dyn PersistencePort> = Arc::new(InMemoryPersistence::new());
        let clock = Arc::new(FakeClock::new(Utc::now()));
        let check = seed_check(&persistence, Uuid::new_v4());
        persistence.create_check(check.clone()).await.unwrap();
        let svc = scheduler(persistence.clone(), clock);

        svc.execute_task(check.tenant_id, check.id).await.unwrap();

        let updated = persistence.get_check(check.tenant_id, check.id).await.unwrap().unwrap();
        assert!(updated.last_run_at.is_some());
        assert_eq!(svc.stats().failures, 1);
    }

    #[tokio::test]
    async fn execute_task_rejects_concurrent_dispatch_of_same_check() {
        let persistence: Arc<dyn PersistencePort> = Arc::new(InMemoryPersistence::new());
        let clock = Arc::new(FakeClock::new(Utc::now()));
        let check = seed_check(&persistence, Uuid::new_v4());
        persistence.create_check(check.clone()).await.unwrap();
        let cache: Arc<dyn CachePort> = Arc::new(InMemoryCache::new());
        let lease = Lease::acquire(cache.clone(), check.id, Duration::from_secs(30)).await.unwrap().unwrap();

        let core: Arc<dyn CoreService> = Arc::new(platform_executor::DefaultCoreService::new(clock.clone()));
        let incidents: Arc<dyn IncidentService> = Arc::new(DefaultIncidentService::new(
            persistence.clone(),
            clock.clone(),
            Arc::new(UuidGenerator),
            SeverityPolicy::default(),
            chrono::Duration::seconds(30),
            chrono::Duration::minutes(10),
        ));
        let svc = DefaultScheduler::new(persistence, cache, core, incidents, clock, config());

        let result = svc.execute_task(check.tenant_id, check.id).await;
        assert!(result.is_err());
        lease.release().await;
    }
}
