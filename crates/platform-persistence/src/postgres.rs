use async_trait::async_trait;
use chrono::{DateTime, Utc};
use platform_kernel::AppError;
use platform_models::{ApiKey, Check, CheckResult, Incident, IncidentEvent, Schedule, Session, Tenant, User};
use sqlx::{PgPool, Row};
use std::time::Duration;
use uuid::Uuid;

use crate::port::{Page, Pagination, PersistencePort};

/// Production adapter backed by Postgres. Every query that scopes by
/// tenant includes `tenant_id` in its `WHERE` clause rather than trusting
/// the caller to pre-filter.
pub struct SqlxPostgresPersistence {
    pool: PgPool,
}

impl SqlxPostgresPersistence {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, AppError> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(AppError::internal)?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl PersistencePort for SqlxPostgresPersistence {
    async fn create_tenant(&self, tenant: Tenant) -> Result<Tenant, AppError> {
        let row = sqlx::query_as::<_, Tenant>(
            "INSERT INTO tenants (id, name, slug, settings, created_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(tenant.id)
        .bind(&tenant.name)
        .bind(&tenant.slug)
        .bind(&tenant.settings)
        .bind(tenant.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_tenant(&self, tenant_id: Uuid) -> Result<Option<Tenant>, AppError> {
        let row = sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE id = $1")
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_tenant_by_slug(&self, slug: &str) -> Result<Option<Tenant>, AppError> {
        let row = sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update_tenant_settings(&self, tenant_id: Uuid, settings: serde_json::Value) -> Result<Tenant, AppError> {
        let row = sqlx::query_as::<_, Tenant>(
            "UPDATE tenants SET settings = $2 WHERE id = $1 RETURNING *",
        )
        .bind(tenant_id)
        .bind(&settings)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::not_found("tenant not found"))?;
        Ok(row)
    }

    async fn create_user(&self, user: User) -> Result<User, AppError> {
        let row = sqlx::query_as::<_, User>(
            "INSERT INTO users (id, email, password_hash, tenant_id, is_active, is_admin, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING *",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.tenant_id)
        .bind(user.is_active)
        .bind(user.is_admin)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_user(&self, tenant_id: Uuid, user_id: Uuid) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND tenant_id = $2")
            .bind(user_id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn create_session(&self, session: Session) -> Result<Session, AppError> {
        let row = sqlx::query_as::<_, Session>(
            "INSERT INTO sessions (id, user_id, access_token_hash, refresh_token_hash, expires_at, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING *",
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(&session.access_token_hash)
        .bind(&session.refresh_token_hash)
        .bind(session.expires_at)
        .bind(session.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_session_by_access_hash(&self, access_token_hash: &str) -> Result<Option<Session>, AppError> {
        let row = sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE access_token_hash = $1")
            .bind(access_token_hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_session_by_refresh_hash(&self, refresh_token_hash: &str) -> Result<Option<Session>, AppError> {
        let row = sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE refresh_token_hash = $1")
            .bind(refresh_token_hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn delete_session(&self, session_id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_api_key(&self, api_key: ApiKey) -> Result<ApiKey, AppError> {
        let row = sqlx::query_as::<_, ApiKey>(
            "INSERT INTO api_keys (id, tenant_id, key_hash, secret_hash, display_name, is_active, expires_at, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING *",
        )
        .bind(api_key.id)
        .bind(api_key.tenant_id)
        .bind(&api_key.key_hash)
        .bind(&api_key.secret_hash)
        .bind(&api_key.display_name)
        .bind(api_key.is_active)
        .bind(api_key.expires_at)
        .bind(api_key.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_api_key_by_key_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, AppError> {
        let row = sqlx::query_as::<_, ApiKey>("SELECT * FROM api_keys WHERE key_hash = $1")
            .bind(key_hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_api_keys(&self, tenant_id: Uuid) -> Result<Vec<ApiKey>, AppError> {
        let rows = sqlx::query_as::<_, ApiKey>("SELECT * FROM api_keys WHERE tenant_id = $1 ORDER BY created_at DESC")
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn revoke_api_key(&self, tenant_id: Uuid, api_key_id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE api_keys SET is_active = false WHERE id = $1 AND tenant_id = $2")
            .bind(api_key_id)
            .bind(tenant_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_check(&self, check: Check) -> Result<Check, AppError> {
        let row = sqlx::query_as::<_, Check>(
            "INSERT INTO checks (id, tenant_id, name, check_type, target, interval_seconds, timeout_seconds, status, priority, last_run_at, next_run_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING *",
        )
        .bind(check.id)
        .bind(check.tenant_id)
        .bind(&check.name)
        .bind(check.check_type)
        .bind(&check.target)
        .bind(check.interval_seconds)
        .bind(check.timeout_seconds)
        .bind(check.status)
        .bind(check.priority)
        .bind(check.last_run_at)
        .bind(check.next_run_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_check(&self, tenant_id: Uuid, check_id: Uuid) -> Result<Option<Check>, AppError> {
        let row = sqlx::query_as::<_, Check>("SELECT * FROM checks WHERE id = $1 AND tenant_id = $2")
            .bind(check_id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_checks(&self, tenant_id: Uuid, pagination: Pagination) -> Result<Page<Check>, AppError> {
        let items = sqlx::query_as::<_, Check>(
            "SELECT * FROM checks WHERE tenant_id = $1 ORDER BY id LIMIT $2 OFFSET $3",
        )
        .bind(tenant_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM checks WHERE tenant_id = $1")
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(Page { items, total })
    }

    async fn list_due_checks(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<Check>, AppError> {
        let rows = sqlx::query_as::<_, Check>(
            "SELECT * FROM checks
             WHERE status = 'active' AND (next_run_at IS NULL OR next_run_at <= $1)
             ORDER BY priority ASC, next_run_at ASC NULLS FIRST
             LIMIT $2",
        )
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn update_check(&self, check: Check) -> Result<Check, AppError> {
        let row = sqlx::query_as::<_, Check>(
            "UPDATE checks SET name = $2, target = $3, interval_seconds = $4, timeout_seconds = $5,
                status = $6, priority = $7
             WHERE id = $1
             RETURNING *",
        )
        .bind(check.id)
        .bind(&check.name)
        .bind(&check.target)
        .bind(check.interval_seconds)
        .bind(check.timeout_seconds)
        .bind(check.status)
        .bind(check.priority)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_check(&self, tenant_id: Uuid, check_id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM checks WHERE id = $1 AND tenant_id = $2")
            .bind(check_id)
            .bind(tenant_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_check_dispatched(
        &self,
        check_id: Uuid,
        last_run_at: DateTime<Utc>,
        next_run_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE checks SET last_run_at = $2, next_run_at = $3 WHERE id = $1")
            .bind(check_id)
            .bind(last_run_at)
            .bind(next_run_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn record_check_result(&self, result: CheckResult) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO check_results (check_id, tenant_id, is_success, error_message, duration_ms, timestamp, metadata)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(result.check_id)
        .bind(result.tenant_id)
        .bind(result.is_success)
        .bind(&result.error_message)
        .bind(result.duration.as_millis() as i64)
        .bind(result.timestamp)
        .bind(&result.metadata)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_check_results(
        &self,
        tenant_id: Uuid,
        check_id: Uuid,
        pagination: Pagination,
    ) -> Result<Page<CheckResult>, AppError> {
        let rows = sqlx::query(
            "SELECT check_id, tenant_id, is_success, error_message, duration_ms, timestamp, metadata
             FROM check_results
             WHERE tenant_id = $1 AND check_id = $2
             ORDER BY timestamp DESC
             LIMIT $3 OFFSET $4",
        )
        .bind(tenant_id)
        .bind(check_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(|row| CheckResult {
                check_id: row.get("check_id"),
                tenant_id: row.get("tenant_id"),
                is_success: row.get("is_success"),
                error_message: row.get("error_message"),
                duration: Duration::from_millis(row.get::<i64, _>("duration_ms") as u64),
                timestamp: row.get("timestamp"),
                metadata: row.get("metadata"),
            })
            .collect();

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM check_results WHERE tenant_id = $1 AND check_id = $2",
        )
        .bind(tenant_id)
        .bind(check_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(Page { items, total })
    }

    async fn create_schedule(&self, schedule: Schedule) -> Result<Schedule, AppError> {
        let row = sqlx::query_as::<_, Schedule>(
            "INSERT INTO schedules (id, check_id, tenant_id, cron_expression, is_active, priority_override, next_run_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING *",
        )
        .bind(schedule.id)
        .bind(schedule.check_id)
        .bind(schedule.tenant_id)
        .bind(&schedule.cron_expression)
        .bind(schedule.is_active)
        .bind(schedule.priority_override)
        .bind(schedule.next_run_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_schedule_for_check(&self, tenant_id: Uuid, check_id: Uuid) -> Result<Option<Schedule>, AppError> {
        let row = sqlx::query_as::<_, Schedule>(
            "SELECT * FROM schedules WHERE tenant_id = $1 AND check_id = $2",
        )
        .bind(tenant_id)
        .bind(check_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_schedules(&self, tenant_id: Uuid, pagination: Pagination) -> Result<Page<Schedule>, AppError> {
        let items = sqlx::query_as::<_, Schedule>(
            "SELECT * FROM schedules WHERE tenant_id = $1 ORDER BY id LIMIT $2 OFFSET $3",
        )
        .bind(tenant_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schedules WHERE tenant_id = $1")
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(Page { items, total })
    }

    async fn update_schedule_next_run(&self, schedule_id: Uuid, next_run_at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query("UPDATE schedules SET next_run_at = $2 WHERE id = $1")
            .bind(schedule_id)
            .bind(next_run_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_open_incident(
        &self,
        tenant_id: Uuid,
        check_id: Uuid,
        error_hash: &str,
    ) -> Result<Option<Incident>, AppError> {
        let row = sqlx::query_as::<_, Incident>(
            "SELECT * FROM incidents
             WHERE tenant_id = $1 AND check_id = $2 AND error_hash = $3
               AND status IN ('OPEN', 'ACKNOWLEDGED')",
        )
        .bind(tenant_id)
        .bind(check_id)
        .bind(error_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_open_incidents_for_check(&self, tenant_id: Uuid, check_id: Uuid) -> Result<Vec<Incident>, AppError> {
        let rows = sqlx::query_as::<_, Incident>(
            "SELECT * FROM incidents
             WHERE tenant_id = $1 AND check_id = $2 AND status IN ('OPEN', 'ACKNOWLEDGED')",
        )
        .bind(tenant_id)
        .bind(check_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn find_latest_resolved_incident(
        &self,
        tenant_id: Uuid,
        check_id: Uuid,
        error_hash: &str,
    ) -> Result<Option<Incident>, AppError> {
        let row = sqlx::query_as::<_, Incident>(
            "SELECT * FROM incidents
             WHERE tenant_id = $1 AND check_id = $2 AND error_hash = $3 AND status = 'RESOLVED'
             ORDER BY resolved_at DESC
             LIMIT 1",
        )
        .bind(tenant_id)
        .bind(check_id)
        .bind(error_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn create_incident(&self, incident: Incident) -> Result<Incident, AppError> {
        let row = sqlx::query_as::<_, Incident>(
            "INSERT INTO incidents (
                id, tenant_id, check_id, error_message, error_hash, status, severity, count,
                first_seen, last_seen, resolved_at, acknowledged_at, acknowledged_by
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
             RETURNING *",
        )
        .bind(incident.id)
        .bind(incident.tenant_id)
        .bind(incident.check_id)
        .bind(&incident.error_message)
        .bind(&incident.error_hash)
        .bind(incident.status)
        .bind(incident.severity)
        .bind(incident.count)
        .bind(incident.first_seen)
        .bind(incident.last_seen)
        .bind(incident.resolved_at)
        .bind(incident.acknowledged_at)
        .bind(incident.acknowledged_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_incident(&self, incident: Incident) -> Result<Incident, AppError> {
        let row = sqlx::query_as::<_, Incident>(
            "UPDATE incidents SET
                status = $2, severity = $3, count = $4, last_seen = $5,
                resolved_at = $6, acknowledged_at = $7, acknowledged_by = $8
             WHERE id = $1
             RETURNING *",
        )
        .bind(incident.id)
        .bind(incident.status)
        .bind(incident.severity)
        .bind(incident.count)
        .bind(incident.last_seen)
        .bind(incident.resolved_at)
        .bind(incident.acknowledged_at)
        .bind(incident.acknowledged_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_incident(&self, tenant_id: Uuid, incident_id: Uuid) -> Result<Option<Incident>, AppError> {
        let row = sqlx::query_as::<_, Incident>("SELECT * FROM incidents WHERE id = $1 AND tenant_id = $2")
            .bind(incident_id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_incidents(&self, tenant_id: Uuid, pagination: Pagination) -> Result<Page<Incident>, AppError> {
        let items = sqlx::query_as::<_, Incident>(
            "SELECT * FROM incidents WHERE tenant_id = $1 ORDER BY last_seen DESC LIMIT $2 OFFSET $3",
        )
        .bind(tenant_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM incidents WHERE tenant_id = $1")
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(Page { items, total })
    }

    async fn list_stale_open_incidents(
        &self,
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Incident>, AppError> {
        let rows = sqlx::query_as::<_, Incident>(
            "SELECT * FROM incidents
             WHERE status IN ('OPEN', 'ACKNOWLEDGED') AND last_seen < $1
             ORDER BY last_seen ASC
             LIMIT $2",
        )
        .bind(older_than)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn append_incident_event(&self, event: IncidentEvent) -> Result<IncidentEvent, AppError> {
        let row = sqlx::query_as::<_, IncidentEvent>(
            "INSERT INTO incident_events (id, incident_id, event_type, message, actor, metadata, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING *",
        )
        .bind(event.id)
        .bind(event.incident_id)
        .bind(event.event_type)
        .bind(&event.message)
        .bind(event.actor)
        .bind(&event.metadata)
        .bind(event.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_incident_events(&self, incident_id: Uuid) -> Result<Vec<IncidentEvent>, AppError> {
        let rows = sqlx::query_as::<_, IncidentEvent>(
            "SELECT * FROM incident_events WHERE incident_id = $1 ORDER BY created_at ASC",
        )
        .bind(incident_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
