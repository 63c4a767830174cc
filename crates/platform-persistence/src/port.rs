use async_trait::async_trait;
use chrono::{DateTime, Utc};
use platform_kernel::AppError;
use platform_models::{ApiKey, Check, CheckResult, Incident, IncidentEvent, Schedule, Session, Tenant, User};
use uuid::Uuid;

/// Page of results plus whether more pages exist beyond it.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
}

impl Pagination {
    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.page_size as i64
    }

    pub fn limit(&self) -> i64 {
        self.page_size as i64
    }
}

/// Storage contract for every entity in the data model. All operations
/// below `tenant_id` are tenant-scoped: implementations must never return
/// or mutate a row belonging to a different tenant than the one given,
/// even when the caller supplies a valid id.
#[async_trait]
pub trait PersistencePort: Send + Sync {
    async fn create_tenant(&self, tenant: Tenant) -> Result<Tenant, AppError>;
    async fn get_tenant(&self, tenant_id: Uuid) -> Result<Option<Tenant>, AppError>;
    async fn get_tenant_by_slug(&self, slug: &str) -> Result<Option<Tenant>, AppError>;
    /// Persists the full `settings` bag; the gateway's config routes are the only caller.
    async fn update_tenant_settings(&self, tenant_id: Uuid, settings: serde_json::Value) -> Result<Tenant, AppError>;

    async fn create_user(&self, user: User) -> Result<User, AppError>;
    async fn get_user(&self, tenant_id: Uuid, user_id: Uuid) -> Result<Option<User>, AppError>;
    /// Email is globally unique across tenants, not tenant-scoped like the
    /// rest of this port.
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn create_session(&self, session: Session) -> Result<Session, AppError>;
    async fn get_session_by_access_hash(&self, access_token_hash: &str) -> Result<Option<Session>, AppError>;
    async fn get_session_by_refresh_hash(&self, refresh_token_hash: &str) -> Result<Option<Session>, AppError>;
    async fn delete_session(&self, session_id: Uuid) -> Result<(), AppError>;

    async fn create_api_key(&self, api_key: ApiKey) -> Result<ApiKey, AppError>;
    async fn get_api_key_by_key_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, AppError>;
    async fn list_api_keys(&self, tenant_id: Uuid) -> Result<Vec<ApiKey>, AppError>;
    async fn revoke_api_key(&self, tenant_id: Uuid, api_key_id: Uuid) -> Result<(), AppError>;

    async fn create_check(&self, check: Check) -> Result<Check, AppError>;
    async fn get_check(&self, tenant_id: Uuid, check_id: Uuid) -> Result<Option<Check>, AppError>;
    async fn list_checks(&self, tenant_id: Uuid, pagination: Pagination) -> Result<Page<Check>, AppError>;
    async fn list_due_checks(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<Check>, AppError>;
    async fn update_check(&self, check: Check) -> Result<Check, AppError>;
    async fn delete_check(&self, tenant_id: Uuid, check_id: Uuid) -> Result<(), AppError>;
    async fn mark_check_dispatched(
        &self,
        check_id: Uuid,
        last_run_at: DateTime<Utc>,
        next_run_at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    /// Appends one executed check's outcome to its history, backing
    /// `GET /core/{check_id}/history`. Not part of the dedup/incident
    /// pipeline; purely an audit trail of raw executions.
    async fn record_check_result(&self, result: CheckResult) -> Result<(), AppError>;
    async fn list_check_results(
        &self,
        tenant_id: Uuid,
        check_id: Uuid,
        pagination: Pagination,
    ) -> Result<Page<CheckResult>, AppError>;

    async fn create_schedule(&self, schedule: Schedule) -> Result<Schedule, AppError>;
    async fn get_schedule_for_check(&self, tenant_id: Uuid, check_id: Uuid) -> Result<Option<Schedule>, AppError>;
    async fn list_schedules(&self, tenant_id: Uuid, pagination: Pagination) -> Result<Page<Schedule>, AppError>;
    async fn update_schedule_next_run(&self, schedule_id: Uuid, next_run_at: DateTime<Utc>) -> Result<(), AppError>;

    /// Finds an open-family incident matching `(check_id, error_hash)`, the
    /// dedup key used by C3.
    async fn find_open_incident(
        &self,
        tenant_id: Uuid,
        check_id: Uuid,
        error_hash: &str,
    ) -> Result<Option<Incident>, AppError>;
    /// All OPEN/ACKNOWLEDGED incidents for a check regardless of
    /// `error_hash`, used to auto-resolve everything a recovered check was
    /// failing on.
    async fn list_open_incidents_for_check(&self, tenant_id: Uuid, check_id: Uuid) -> Result<Vec<Incident>, AppError>;
    /// The most recently resolved incident for `(check_id, error_hash)`, a
    /// candidate for reopening if within the reopen window.
    async fn find_latest_resolved_incident(
        &self,
        tenant_id: Uuid,
        check_id: Uuid,
        error_hash: &str,
    ) -> Result<Option<Incident>, AppError>;
    async fn create_incident(&self, incident: Incident) -> Result<Incident, AppError>;
    async fn update_incident(&self, incident: Incident) -> Result<Incident, AppError>;
    async fn get_incident(&self, tenant_id: Uuid, incident_id: Uuid) -> Result<Option<Incident>, AppError>;
    async fn list_incidents(&self, tenant_id: Uuid, pagination: Pagination) -> Result<Page<Incident>, AppError>;
    /// Open-family incidents whose `last_seen` is older than `older_than`,
    /// candidates for auto-resolution.
    async fn list_stale_open_incidents(
        &self,
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Incident>, AppError>;

    async fn append_incident_event(&self, event: IncidentEvent) -> Result<IncidentEvent, AppError>;
    async fn list_incident_events(&self, incident_id: Uuid) -> Result<Vec<IncidentEvent>, AppError>;
}
