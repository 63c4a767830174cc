//! `/api/v1/core`: execute-now, status and history for a
//! single check, fanned out to the scheduler/persistence backends through
//! the resilience wrapper.

use std::sync::Arc;

use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use platform_kernel::{AppError, Identity};
use platform_models::CheckResult;
use platform_persistence::Pagination;
use serde::Serialize;
use uuid::Uuid;

use crate::errors::GatewayError;
use crate::routes::checks::ListQuery;
use crate::state::AppState;

pub async fn execute(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(check_id): Path<Uuid>,
) -> Result<StatusCode, GatewayError> {
    let scheduler = state.scheduler.clone();
    state
        .scheduler_backend
        .call(|| {
            let scheduler = scheduler.clone();
            async move { scheduler.execute_task(identity.tenant_id, check_id).await }
        })
        .await?;
    Ok(StatusCode::ACCEPTED)
}

#[derive(Serialize)]
pub struct CheckStatusResponse {
    pub check_id: Uuid,
    pub status: platform_models::CheckStatus,
    pub last_run_at: Option<chrono::DateTime<chrono::Utc>>,
    pub next_run_at: Option<chrono::DateTime<chrono::Utc>>,
}

pub async fn status(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(check_id): Path<Uuid>,
) -> Result<Json<CheckStatusResponse>, GatewayError> {
    let check = state
        .persistence
        .get_check(identity.tenant_id, check_id)
        .await?
        .ok_or_else(|| AppError::not_found("check not found"))?;
    Ok(Json(CheckStatusResponse {
        check_id: check.id,
        status: check.status,
        last_run_at: check.last_run_at,
        next_run_at: check.next_run_at,
    }))
}

pub async fn history(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(check_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<CheckResult>>, GatewayError> {
    let page = state
        .persistence
        .list_check_results(
            identity.tenant_id,
            check_id,
            Pagination { page: query.page, page_size: query.page_size },
        )
        .await?;
    Ok(Json(page.items))
}
