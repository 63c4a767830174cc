use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use platform_kernel::AppError;
use platform_models::{ApiKey, Check, CheckResult, CheckStatus, Incident, IncidentEvent, Schedule, Session, Tenant, User};
use uuid::Uuid;

use crate::port::{Page, Pagination, PersistencePort};

/// In-process, single-node store used by unit tests and the in-memory
/// deployment profile. Mirrors the tenant-scoping rules of the real
/// adapter so tests exercise the same isolation guarantees.
#[derive(Default)]
pub struct InMemoryPersistence {
    tenants: Mutex<HashMap<Uuid, Tenant>>,
    users: Mutex<HashMap<Uuid, User>>,
    sessions: Mutex<HashMap<Uuid, Session>>,
    api_keys: Mutex<HashMap<Uuid, ApiKey>>,
    checks: Mutex<HashMap<Uuid, Check>>,
    schedules: Mutex<HashMap<Uuid, Schedule>>,
    incidents: Mutex<HashMap<Uuid, Incident>>,
    incident_events: Mutex<HashMap<Uuid, Vec<IncidentEvent>>>,
    check_results: Mutex<Vec<CheckResult>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl PersistencePort for InMemoryPersistence {
    async fn create_tenant(&self, tenant: Tenant) -> Result<Tenant, AppError> {
        lock(&self.tenants).insert(tenant.id, tenant.clone());
        Ok(tenant)
    }

    async fn get_tenant(&self, tenant_id: Uuid) -> Result<Option<Tenant>, AppError> {
        Ok(lock(&self.tenants).get(&tenant_id).cloned())
    }

    async fn get_tenant_by_slug(&self, slug: &str) -> Result<Option<Tenant>, AppError> {
        Ok(lock(&self.tenants).values().find(|t| t.slug == slug).cloned())
    }

    async fn update_tenant_settings(&self, tenant_id: Uuid, settings: serde_json::Value) -> Result<Tenant, AppError> {
        let mut tenants = lock(&self.tenants);
        let tenant = tenants.get_mut(&tenant_id).ok_or_else(|| AppError::not_found("tenant not found"))?;
        tenant.settings = settings;
        Ok(tenant.clone())
    }

    async fn create_user(&self, user: User) -> Result<User, AppError> {
        lock(&self.users).insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, tenant_id: Uuid, user_id: Uuid) -> Result<Option<User>, AppError> {
        Ok(lock(&self.users)
            .get(&user_id)
            .filter(|u| u.tenant_id == tenant_id)
            .cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(lock(&self.users).values().find(|u| u.email == email).cloned())
    }

    async fn create_session(&self, session: Session) -> Result<Session, AppError> {
        lock(&self.sessions).insert(session.id, session.clone());
        Ok(session)
    }

    async fn get_session_by_access_hash(&self, access_token_hash: &str) -> Result<Option<Session>, AppError> {
        Ok(lock(&self.sessions)
            .values()
            .find(|s| s.access_token_hash == access_token_hash)
            .cloned())
    }

    async fn get_session_by_refresh_hash(&self, refresh_token_hash: &str) -> Result<Option<Session>, AppError> {
        Ok(lock(&self.sessions)
            .values()
            .find(|s| s.refresh_token_hash == refresh_token_hash)
            .cloned())
    }

    async fn delete_session(&self, session_id: Uuid) -> Result<(), AppError> {
        lock(&self.sessions).remove(&session_id);
        Ok(())
    }

    async fn create_api_key(&self, api_key: ApiKey) -> Result<ApiKey, AppError> {
        lock(&self.api_keys).insert(api_key.id, api_key.clone());
        Ok(api_key)
    }

    async fn get_api_key_by_key_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, AppError> {
        Ok(lock(&self.api_keys).values().find(|k| k.key_hash == key_hash).cloned())
    }

    async fn list_api_keys(&self, tenant_id: Uuid) -> Result<Vec<ApiKey>, AppError> {
        Ok(lock(&self.api_keys)
            .values()
            .filter(|k| k.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn revoke_api_key(&self, tenant_id: Uuid, api_key_id: Uuid) -> Result<(), AppError> {
        let mut keys = lock(&self.api_keys);
        if let Some(key) = keys.get_mut(&api_key_id) {
            if key.tenant_id == tenant_id {
                key.is_active = false;
            }
        }
        Ok(())
    }

    async fn create_check(&self, check: Check) -> Result<Check, AppError> {
        lock(&self.checks).insert(check.id, check.clone());
        Ok(check)
    }

    async fn get_check(&self, tenant_id: Uuid, check_id: Uuid) -> Result<Option<Check>, AppError> {
        Ok(lock(&self.checks)
            .get(&check_id)
            .filter(|c| c.tenant_id == tenant_id)
            .cloned())
    }

    async fn list_checks(&self, tenant_id: Uuid, pagination: Pagination) -> Result<Page<Check>, AppError> {
        let mut matching: Vec<Check> = lock(&self.checks)
            .values()
            .filter(|c| c.tenant_id == tenant_id)
            .cloned()
            .collect();
        matching.sort_by_key(|c| c.id);
        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(pagination.offset() as usize)
            .take(pagination.limit() as usize)
            .collect();
        Ok(Page { items, total })
    }

    async fn list_due_checks(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<Check>, AppError> {
        let mut due: Vec<Check> = lock(&self.checks)
            .values()
            .filter(|c| c.status == CheckStatus::Active && c.is_eligible_for_dispatch(now))
            .cloned()
            .collect();
        due.sort_by_key(|c| (c.priority, c.next_run_at));
        due.truncate(limit.max(0) as usize);
        Ok(due)
    }

    async fn update_check(&self, check: Check) -> Result<Check, AppError> {
        lock(&self.checks).insert(check.id, check.clone());
        Ok(check)
    }

    async fn delete_check(&self, tenant_id: Uuid, check_id: Uuid) -> Result<(), AppError> {
        let mut checks = lock(&self.checks);
        if checks.get(&check_id).map(|c| c.tenant_id) == Some(tenant_id) {
            checks.remove(&check_id);
        }
        Ok(())
    }

    async fn mark_check_dispatched(
        &self,
        check_id: Uuid,
        last_run_at: DateTime<Utc>,
        next_run_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        if let Some(check) = lock(&self.checks).get_mut(&check_id) {
            check.last_run_at = Some(last_run_at);
            check.next_run_at = Some(next_run_at);
        }
        Ok(())
    }

    async fn record_check_result(&self, result: CheckResult) -> Result<(), AppError> {
        lock(&self.check_results).push(result);
        Ok(())
    }

    async fn list_check_results(
        &self,
        tenant_id: Uuid,
        check_id: Uuid,
        pagination: Pagination,
    ) -> Result<Page<CheckResult>, AppError> {
        let mut matching: Vec<CheckResult> = lock(&self.check_results)
            .iter()
            .filter(|r| r.tenant_id == tenant_id && r.check_id == check_id)
            .cloned()
            .collect();
        matching.sort_by_key(|r| std::cmp::Reverse(r.timestamp));
        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(pagination.offset() as usize)
            .take(pagination.limit() as usize)
            .collect();
        Ok(Page { items, total })
    }

    async fn create_schedule(&self, schedule: Schedule) -> Result<Schedule, AppError> {
        lock(&self.schedules).insert(schedule.id, schedule.clone());
        Ok(schedule)
    }

    async fn get_schedule_for_check(&self, tenant_id: Uuid, check_id: Uuid) -> Result<Option<Schedule>, AppError> {
        Ok(lock(&self.schedules)
            .values()
            .find(|s| s.tenant_id == tenant_id && s.check_id == check_id)
            .cloned())
    }

    async fn list_schedules(&self, tenant_id: Uuid, pagination: Pagination) -> Result<Page<Schedule>, AppError> {
        let mut matching: Vec<Schedule> =
            lock(&self.schedules).values().filter(|s| s.tenant_id == tenant_id).cloned().collect();
        matching.sort_by_key(|s| s.id);
        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(pagination.offset() as usize)
            .take(pagination.limit() as usize)
            .collect();
        Ok(Page { items, total })
    }

    async fn update_schedule_next_run(&self, schedule_id: Uuid, next_run_at: DateTime<Utc>) -> Result<(), AppError> {
        if let Some(schedule) = lock(&self.schedules).get_mut(&schedule_id) {
            schedule.next_run_at = Some(next_run_at);
        }
        Ok(())
    }

    async fn find_open_incident(
        &self,
        tenant_id: Uuid,
        check_id: Uuid,
        error_hash: &str,
    ) -> Result<Option<Incident>, AppError> {
        Ok(lock(&self.incidents)
            .values()
            .find(|i| {
                i.tenant_id == tenant_id
                    && i.check_id == check_id
                    && i.error_hash == error_hash
                    && i.is_open_family()
            })
            .cloned())
    }

    async fn list_open_incidents_for_check(&self, tenant_id: Uuid, check_id: Uuid) -> Result<Vec<Incident>, AppError> {
        Ok(lock(&self.incidents)
            .values()
            .filter(|i| i.tenant_id == tenant_id && i.check_id == check_id && i.is_open_family())
            .cloned()
            .collect())
    }

    async fn find_latest_resolved_incident(
        &self,
        tenant_id: Uuid,
        check_id: Uuid,
        error_hash: &str,
    ) -> Result<Option<Incident>, AppError> {
        Ok(lock(&self.incidents)
            .values()
            .filter(|i| {
                i.tenant_id == tenant_id
                    && i.check_id == check_id
                    && i.error_hash == error_hash
                    && i.status == platform_models::IncidentStatus::Resolved
            })
            .max_by_key(|i| i.resolved_at)
            .cloned())
    }

    async fn create_incident(&self, incident: Incident) -> Result<Incident, AppError> {
        lock(&self.incidents).insert(incident.id, incident.clone());
        Ok(incident)
    }

    async fn update_incident(&self, incident: Incident) -> Result<Incident, AppError> {
        lock(&self.incidents).insert(incident.id, incident.clone());
        Ok(incident)
    }

    async fn get_incident(&self, tenant_id: Uuid, incident_id: Uuid) -> Result<Option<Incident>, AppError> {
        Ok(lock(&self.incidents)
            .get(&incident_id)
            .filter(|i| i.tenant_id == tenant_id)
            .cloned())
    }

    async fn list_incidents(&self, tenant_id: Uuid, pagination: Pagination) -> Result<Page<Incident>, AppError> {
        let mut matching: Vec<Incident> = lock(&self.incidents)
            .values()
            .filter(|i| i.tenant_id == tenant_id)
            .cloned()
            .collect();
        matching.sort_by_key(|i| std::cmp::Reverse(i.last_seen));
        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(pagination.offset() as usize)
            .take(pagination.limit() as usize)
            .collect();
        Ok(Page { items, total })
    }

    async fn list_stale_open_incidents(
        &self,
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Incident>, AppError> {
        let mut stale: Vec<Incident> = lock(&self.incidents)
            .values()
            .filter(|i| i.is_open_family() && i.last_seen < older_than)
            .cloned()
            .collect();
        stale.sort_by_key(|i| i.last_seen);
        stale.truncate(limit.max(0) as usize);
        Ok(stale)
    }

    async fn append_incident_event(&self, event: IncidentEvent) -> Result<IncidentEvent, AppError> {
        lock(&self.incident_events)
            .entry(event.incident_id)
            .or_default()
            .push(event.clone());
        Ok(event)
    }

    async fn list_incident_events(&self, incident_id: Uuid) -> Result<Vec<IncidentEvent>, AppError> {
        Ok(lock(&self.incident_events)
            .get(&incident_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform_models::CheckType;

    fn tenant() -> Tenant {
        Tenant::new(Uuid::new_v4(), "Acme", "acme", Utc::now())
    }

    fn check(tenant_id: Uuid) -> Check {
        Check {
            id: Uuid::new_v4(),
            tenant_id,
            name: "homepage".into(),
            check_type: CheckType::Http,
            target: "https://example.com".into(),
            interval_seconds: 60,
            timeout_seconds: 5,
            status: CheckStatus::Active,
            priority: 2,
            last_run_at: None,
            next_run_at: Some(Utc::now() - chrono::Duration::seconds(1)),
        }
    }

    #[tokio::test]
    async fn checks_are_isolated_per_tenant() {
        let store = InMemoryPersistence::new();
        let tenant_a = tenant();
        let tenant_b = tenant();
        let check_a = check(tenant_a.id);
        store.create_check(check_a.clone()).await.unwrap();

        assert!(store.get_check(tenant_a.id, check_a.id).await.unwrap().is_some());
        assert!(store.get_check(tenant_b.id, check_a.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_due_checks_only_returns_active_past_due() {
        let store = InMemoryPersistence::new();
        let tenant = tenant();
        let mut paused = check(tenant.id);
        paused.status = CheckStatus::Paused;
        store.create_check(paused).await.unwrap();
        let due = check(tenant.id);
        store.create_check(due.clone()).await.unwrap();

        let results = store.list_due_checks(Utc::now(), 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, due.id);
    }

    #[tokio::test]
    async fn find_open_incident_ignores_resolved() {
        let store = InMemoryPersistence::new();
        let tenant_id = Uuid::new_v4();
        let check_id = Uuid::new_v4();
        let mut incident = Incident {
            id: Uuid::new_v4(),
            tenant_id,
            check_id,
            error_message: "connection refused".into(),
            error_hash: "abc".into(),
            status: platform_models::IncidentStatus::Resolved,
            severity: platform_models::Severity::Error,
            count: 1,
            first_seen: Utc::now(),
            last_seen: Utc::now(),
            resolved_at: Some(Utc::now()),
            acknowledged_at: None,
            acknowledged_by: None,
        };
        store.create_incident(incident.clone()).await.unwrap();
        assert!(store
            .find_open_incident(tenant_id, check_id, "abc")
            .await
            .unwrap()
            .is_none());

        incident.status = platform_models::IncidentStatus::Open;
        incident.resolved_at = None;
        store.update_incident(incident.clone()).await.unwrap();
        assert!(store
            .find_open_incident(tenant_id, check_id, "abc")
            .await
            .unwrap()
            .is_some());
    }
}
