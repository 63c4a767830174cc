use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use platform_kernel::{AppError, Clock, IdGenerator};
use platform_models::{
    CheckResult, Incident, IncidentEvent, IncidentEventType, IncidentStatus,
};
use platform_persistence::{Page, Pagination, PersistencePort};
use serde_json::Value;
use uuid::Uuid;

use crate::fingerprint::error_hash;
use crate::severity::SeverityPolicy;

/// Public contract for the incident subsystem.
#[async_trait]
pub trait IncidentService: Send + Sync {
    async fn ingest(&self, result: CheckResult) -> Result<Option<Incident>, AppError>;
    async fn acknowledge(&self, tenant_id: Uuid, incident_id: Uuid, actor: Option<Uuid>) -> Result<Incident, AppError>;
    async fn resolve(&self, tenant_id: Uuid, incident_id: Uuid, actor: Option<Uuid>) -> Result<Incident, AppError>;
    async fn get(&self, tenant_id: Uuid, incident_id: Uuid) -> Result<Option<Incident>, AppError>;
    async fn list(&self, tenant_id: Uuid, pagination: Pagination) -> Result<Page<Incident>, AppError>;
    async fn list_events(&self, incident_id: Uuid) -> Result<Vec<IncidentEvent>, AppError>;
    /// Resolves every open-family incident whose `last_seen` is older than
    /// the configured debounce, called periodically by a background task.
    async fn auto_resolve_stale(&self) -> Result<u64, AppError>;
}

pub struct DefaultIncidentService {
    persistence: Arc<dyn PersistencePort>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    severity_policy: SeverityPolicy,
    auto_resolve_debounce: Duration,
    reopen_window: Duration,
}

impl DefaultIncidentService {
    pub fn new(
        persistence: Arc<dyn PersistencePort>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        severity_policy: SeverityPolicy,
        auto_resolve_debounce: Duration,
        reopen_window: Duration,
    ) -> Self {
        Self {
            persistence,
            clock,
            ids,
            severity_policy,
            auto_resolve_debounce,
            reopen_window,
        }
    }

    async fn append_event(
        &self,
        incident_id: Uuid,
        event_type: IncidentEventType,
        message: impl Into<String>,
        actor: Option<Uuid>,
    ) -> Result<(), AppError> {
        let event = IncidentEvent::new(
            self.ids.new_id(),
            incident_id,
            event_type,
            message,
            actor,
            Value::Null,
            self.clock.now(),
        );
        self.persistence.append_incident_event(event).await?;
        Ok(())
    }

    async fn ingest_failure(&self, result: CheckResult) -> Result<Option<Incident>, AppError> {
        let now = self.clock.now();
        let error_message = result.error_message.clone().unwrap_or_default();
        let hash = error_hash(result.check_id, &error_message);

        if let Some(mut incident) = self
            .persistence
            .find_open_incident(result.tenant_id, result.check_id, &hash)
            .await?
        {
            incident.count += 1;
            incident.last_seen = now;
            let updated = self.persistence.update_incident(incident).await?;
            self.append_event(updated.id, IncidentEventType::Updated, "failure observed again", None)
                .await?;
            return Ok(Some(updated));
        }

        if let Some(resolved) = self
            .persistence
            .find_latest_resolved_incident(result.tenant_id, result.check_id, &hash)
            .await?
        {
            if resolved.within_reopen_window(now, self.reopen_window) {
                let mut reopened = resolved;
                reopened.status = IncidentStatus::Open;
                reopened.count += 1;
                reopened.last_seen = now;
                reopened.resolved_at = None;
                reopened.acknowledged_at = None;
                reopened.acknowledged_by = None;
                let updated = self.persistence.update_incident(reopened).await?;
                self.append_event(updated.id, IncidentEventType::Reopened, "failure recurred within reopen window", None)
                    .await?;
                return Ok(Some(updated));
            }
        }

        let check = self
            .persistence
            .get_check(result.tenant_id, result.check_id)
            .await?
            .ok_or_else(|| AppError::not_found("check not found"))?;
        let incident = Incident {
            id: self.ids.new_id(),
            tenant_id: result.tenant_id,
            check_id: result.check_id,
            error_message,
            error_hash: hash,
            status: IncidentStatus::Open,
            severity: self.severity_policy.severity_for_priority(check.priority),
            count: 1,
            first_seen: now,
            last_seen: now,
            resolved_at: None,
            acknowledged_at: None,
            acknowledged_by: None,
        };
        let created = self.persistence.create_incident(incident).await?;
        self.append_event(created.id, IncidentEventType::Created, "incident opened", None).await?;
        Ok(Some(created))
    }

    async fn ingest_success(&self, result: CheckResult) -> Result<Option<Incident>, AppError> {
        let now = self.clock.now();
        let open = self
            .persistence
            .list_open_incidents_for_check(result.tenant_id, result.check_id)
            .await?;
        let mut last_resolved = None;
        for mut incident in open {
            if now - incident.last_seen < self.auto_resolve_debounce {
                continue;
            }
            incident.status = IncidentStatus::Resolved;
            incident.resolved_at = Some(now);
            let updated = self.persistence.update_incident(incident).await?;
            self.append_event(updated.id, IncidentEventType::Resolved, "check recovered", None).await?;
            last_resolved = Some(updated);
        }
        Ok(last_resolved)
    }
}

#[async_trait]
impl IncidentService for DefaultIncidentService {
    async fn ingest(&self, result: CheckResult) -> Result<Option<Incident>, AppError> {
        if result.is_success {
            self.ingest_success(result).await
        } else {
            self.ingest_failure(result).await
        }
    }

    async fn acknowledge(&self, tenant_id: Uuid, incident_id: Uuid, actor: Option<Uuid>) -> Result<Incident, AppError> {
        let mut incident = self
            .persistence
            .get_incident(tenant_id, incident_id)
            .await?
            .ok_or_else(|| AppError::not_found("incident not found"))?;
        if incident.status != IncidentStatus::Open {
            return Err(AppError::validation("only an OPEN incident can be acknowledged"));
        }
        incident.status = IncidentStatus::Acknowledged;
        incident.acknowledged_at = Some(self.clock.now());
        incident.acknowledged_by = actor;
        let updated = self.persistence.update_incident(incident).await?;
        self.append_event(updated.id, IncidentEventType::Acknowledged, "acknowledged by operator", actor)
            .await?;
        Ok(updated)
    }

    async fn resolve(&self, tenant_id: Uuid, incident_id: Uuid, actor: Option<Uuid>) -> Result<Incident, AppError> {
        let mut incident = self
            .persistence
            .get_incident(tenant_id, incident_id)
            .await?
            .ok_or_else(|| AppError::not_found("incident not found"))?;
        if incident.status == IncidentStatus::Resolved {
            return Ok(incident);
        }
        incident.status = IncidentStatus::Resolved;
        incident.resolved_at = Some(self.clock.now());
        let updated = self.persistence.update_incident(incident).await?;
        self.append_event(updated.id, IncidentEventType::Resolved, "resolved by operator", actor)
            .await?;
        Ok(updated)
    }

    async fn get(&self, tenant_id: Uuid, incident_id: Uuid) -> Result<Option<Incident>, AppError> {
        self.persistence.get_incident(tenant_id, incident_id).await
    }

    async fn list(&self, tenant_id: Uuid, pagination: Pagination) -> Result<Page<Incident>, AppError> {
        self.persistence.list_incidents(tenant_id, pagination).await
    }

    async fn list_events(&self, incident_id: Uuid) -> Result<Vec<IncidentEvent>, AppError> {
        self.persistence.list_incident_events(incident_id).await
    }

    async fn auto_resolve_stale(&self) -> Result<u64, AppError> {
        let older_than = self.clock.now() - self.auto_resolve_debounce;
        let stale = self.persistence.list_stale_open_incidents(older_than, 500).await?;
        let mut resolved = 0u64;
        for mut incident in stale {
            incident.status = IncidentStatus::Resolved;
            incident.resolved_at = Some(self.clock.now());
            let updated = self.persistence.update_incident(incident).await?;
            self.append_event(updated.id, IncidentEventType::Resolved, "auto-resolved: no recent failures", None)
                .await?;
            resolved += 1;
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform_kernel::{FakeClock, UuidGenerator};
    use platform_models::{Check, CheckStatus, CheckType};
    use platform_persistence::InMemoryPersistence;
    use std::time::Duration as StdDuration;

    fn service(persistence: Arc<dyn PersistencePort>, clock: Arc<FakeClock>) -> DefaultIncidentService {
        DefaultIncidentService::new(
            persistence,
            clock,
            Arc::new(UuidGenerator),
            SeverityPolicy::default(),
            Duration::seconds(30),
            Duration::minutes(10),
        )
    }

    async fn seed_check(persistence: &Arc<dyn PersistencePort>, tenant_id: Uuid, priority: i16) -> Uuid {
        let check = Check {
            id: Uuid::new_v4(),
            tenant_id,
            name: "homepage".into(),
            check_type: CheckType::Http,
            target: "https://example.com".into(),
            interval_seconds: 60,
            timeout_seconds: 5,
            status: CheckStatus::Active,
            priority,
            last_run_at: None,
            next_run_at: None,
        };
        persistence.create_check(check.clone()).await.unwrap();
        check.id
    }

    fn failure(tenant_id: Uuid, check_id: Uuid, message: &str, at: chrono::DateTime<chrono::Utc>) -> CheckResult {
        CheckResult::failure(check_id, tenant_id, message, StdDuration::from_millis(50), at)
    }

    #[tokio::test]
    async fn repeated_failures_dedupe_into_one_incident() {
        let persistence: Arc<dyn PersistencePort> = Arc::new(InMemoryPersistence::new());
        let clock = Arc::new(FakeClock::new(chrono::Utc::now()));
        let tenant_id = Uuid::new_v4();
        let check_id = seed_check(&persistence, tenant_id, 1).await;
        let svc = service(persistence.clone(), clock.clone());

        svc.ingest(failure(tenant_id, check_id, "connection refused", clock.now())).await.unwrap();
        clock.advance(Duration::seconds(2));
        let second = svc
            .ingest(failure(tenant_id, check_id, "connection refused", clock.now()))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(second.count, 2);
        assert_eq!(second.status, IncidentStatus::Open);
        let page = svc.list(tenant_id, Pagination { page: 1, page_size: 10 }).await.unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn success_auto_resolves_after_debounce() {
        let persistence: Arc<dyn PersistencePort> = Arc::new(InMemoryPersistence::new());
        let clock = Arc::new(FakeClock::new(chrono::Utc::now()));
        let tenant_id = Uuid::new_v4();
        let check_id = seed_check(&persistence, tenant_id, 2).await;
        let svc = service(persistence.clone(), clock.clone());

        let opened = svc
            .ingest(failure(tenant_id, check_id, "timeout", clock.now()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(opened.severity, platform_models::Severity::Error);

        let success = CheckResult::success(check_id, tenant_id, StdDuration::from_millis(10), clock.now());
        let unresolved = svc.ingest(success.clone()).await.unwrap();
        assert!(unresolved.is_none(), "within debounce window, should not resolve yet");

        clock.advance(Duration::seconds(31));
        let resolved = svc.ingest(success).await.unwrap().unwrap();
        assert_eq!(resolved.status, IncidentStatus::Resolved);
    }

    #[tokio::test]
    async fn reopen_within_window_else_fresh_incident() {
        let persistence: Arc<dyn PersistencePort> = Arc::new(InMemoryPersistence::new());
        let clock = Arc::new(FakeClock::new(chrono::Utc::now()));
        let tenant_id = Uuid::new_v4();
        let check_id = seed_check(&persistence, tenant_id, 3).await;
        let svc = service(persistence.clone(), clock.clone());

        let opened = svc.ingest(failure(tenant_id, check_id, "dns error", clock.now())).await.unwrap().unwrap();
        svc.resolve(tenant_id, opened.id, None).await.unwrap();

        clock.advance(Duration::minutes(5));
        let reopened = svc.ingest(failure(tenant_id, check_id, "dns error", clock.now())).await.unwrap().unwrap();
        assert_eq!(reopened.id, opened.id);
        assert_eq!(reopened.status, IncidentStatus::Open);

        let events = svc.list_events(opened.id).await.unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[2].event_type, IncidentEventType::Reopened);
    }

    #[tokio::test]
    async fn acknowledge_then_resolve_final_state_and_history() {
        let persistence: Arc<dyn PersistencePort> = Arc::new(InMemoryPersistence::new());
        let clock = Arc::new(FakeClock::new(chrono::Utc::now()));
        let tenant_id = Uuid::new_v4();
        let check_id = seed_check(&persistence, tenant_id, 1).await;
        let svc = service(persistence.clone(), clock.clone());

        let opened = svc.ingest(failure(tenant_id, check_id, "500 error", clock.now())).await.unwrap().unwrap();
        let actor = Uuid::new_v4();
        svc.acknowledge(tenant_id, opened.id, Some(actor)).await.unwrap();
        let resolved = svc.resolve(tenant_id, opened.id, Some(actor)).await.unwrap();
        assert_eq!(resolved.status, IncidentStatus::Resolved);

        let events = svc.list_events(opened.id).await.unwrap();
        let types: Vec<_> = events.iter().map(|e| e.event_type).collect();
        assert_eq!(types, vec![IncidentEventType::Created, IncidentEventType::Acknowledged, IncidentEventType::Resolved]);
    }

    #[tokio::test]
    async fn double_resolve_is_idempotent() {
        let persistence: Arc<dyn PersistencePort> = Arc::new(InMemoryPersistence::new());
        let clock = Arc::new(FakeClock::new(chrono::Utc::now()));
        let tenant_id = Uuid::new_v4();
        let check_id = seed_check(&persistence, tenant_id, 1).await;
        let svc = service(persistence.clone(), clock.clone());

        let opened = svc.ingest(failure(tenant_id, check_id, "boom", clock.now())).await.unwrap().unwrap();
        svc.resolve(tenant_id, opened.id, None).await.unwrap();
        let second = svc.resolve(tenant_id, opened.id, None).await.unwrap();
        assert_eq!(second.status, IncidentStatus::Resolved);
    }

    #[tokio::test]
    async fn acknowledge_from_non_open_state_rejected() {
        let persistence: Arc<dyn PersistencePort> = Arc::new(InMemoryPersistence::new());
        let clock = Arc::new(FakeClock::new(chrono::Utc::now()));
        let tenant_id = Uuid::new_v4();
        let check_id = seed_check(&persistence, tenant_id, 1).await;
        let svc = service(persistence.clone(), clock.clone());

        let opened = svc.ingest(failure(tenant_id, check_id, "boom", clock.now())).await.unwrap().unwrap();
        svc.resolve(tenant_id, opened.id, None).await.unwrap();
        assert!(svc.acknowledge(tenant_id, opened.id, None).await.is_err());
    }
}
