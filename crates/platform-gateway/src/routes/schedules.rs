//! `/api/v1/schedules`: binds a check to a cron expression.

use std::sync::Arc;

use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use platform_kernel::{AppError, Identity};
use platform_models::Schedule;
use platform_persistence::Pagination;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::GatewayError;
use crate::routes::checks::ListQuery;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateScheduleRequest {
    pub cron_expression: String,
    #[serde(default)]
    pub priority_override: Option<i16>,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(check_id): Path<Uuid>,
    Json(req): Json<CreateScheduleRequest>,
) -> Result<(StatusCode, Json<Schedule>), GatewayError> {
    state
        .persistence
        .get_check(identity.tenant_id, check_id)
        .await?
        .ok_or_else(|| AppError::not_found("check not found"))?;

    let next_run_at = Schedule::next_occurrence(&req.cron_expression, Utc::now())?;
    let schedule = Schedule {
        id: Uuid::new_v4(),
        check_id,
        tenant_id: identity.tenant_id,
        cron_expression: req.cron_expression,
        is_active: true,
        priority_override: req.priority_override,
        next_run_at: Some(next_run_at),
    };
    let created = state.persistence.create_schedule(schedule).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(check_id): Path<Uuid>,
) -> Result<Json<Schedule>, GatewayError> {
    let schedule = state
        .persistence
        .get_schedule_for_check(identity.tenant_id, check_id)
        .await?
        .ok_or_else(|| AppError::not_found("schedule not found"))?;
    Ok(Json(schedule))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Schedule>>, GatewayError> {
    let page = state
        .persistence
        .list_schedules(identity.tenant_id, Pagination { page: query.page, page_size: query.page_size })
        .await?;
    Ok(Json(page.items))
}

/// No dedicated delete in [`platform_persistence::PersistencePort`]; a
/// schedule is deactivated by clearing its `next_run_at`, which the
/// scheduler's dispatch query (`status = 'active' AND next_run_at IS NULL
/// OR next_run_at <= now`) would otherwise keep picking up, so this instead
/// flips the check itself to paused, the documented way to stop dispatch
/// for a check.
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(check_id): Path<Uuid>,
) -> Result<StatusCode, GatewayError> {
    let mut check = state
        .persistence
        .get_check(identity.tenant_id, check_id)
        .await?
        .ok_or_else(|| AppError::not_found("check not found"))?;
    check.status = platform_models::CheckStatus::Paused;
    state.persistence.update_check(check).await?;
    Ok(StatusCode::NO_CONTENT)
}
