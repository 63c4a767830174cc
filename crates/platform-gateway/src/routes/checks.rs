//! `/api/v1/checks` CRUD. Dispatched straight to the
//! persistence port: checks are owned data, not a fanned-out RPC surface.

use std::sync::Arc;

use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use platform_kernel::{AppError, Identity};
use platform_models::{Check, CheckStatus, CheckType};
use platform_persistence::Pagination;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::GatewayError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateCheckRequest {
    pub name: String,
    pub check_type: CheckType,
    pub target: String,
    pub interval_seconds: i64,
    pub timeout_seconds: i64,
    #[serde(default = "default_priority")]
    pub priority: i16,
}

fn default_priority() -> i16 {
    2
}

#[derive(Deserialize)]
pub struct UpdateCheckRequest {
    pub name: String,
    pub target: String,
    pub interval_seconds: i64,
    pub timeout_seconds: i64,
    pub status: CheckStatus,
    pub priority: i16,
}

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}
fn default_page_size() -> u32 {
    50
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<CreateCheckRequest>,
) -> Result<(StatusCode, Json<Check>), GatewayError> {
    Check::validate_timing(req.interval_seconds, req.timeout_seconds)?;
    Check::validate_priority(req.priority)?;
    let check = Check {
        id: Uuid::new_v4(),
        tenant_id: identity.tenant_id,
        name: req.name,
        check_type: req.check_type,
        target: req.target,
        interval_seconds: req.interval_seconds,
        timeout_seconds: req.timeout_seconds,
        status: CheckStatus::Active,
        priority: req.priority,
        last_run_at: None,
        next_run_at: None,
    };
    let created = state.persistence.create_check(check).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(check_id): Path<Uuid>,
) -> Result<Json<Check>, GatewayError> {
    let check = state
        .persistence
        .get_check(identity.tenant_id, check_id)
        .await?
        .ok_or_else(|| AppError::not_found("check not found"))?;
    Ok(Json(check))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Check>>, GatewayError> {
    let page = state
        .persistence
        .list_checks(identity.tenant_id, Pagination { page: query.page, page_size: query.page_size })
        .await?;
    Ok(Json(page.items))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(check_id): Path<Uuid>,
    Json(req): Json<UpdateCheckRequest>,
) -> Result<Json<Check>, GatewayError> {
    Check::validate_timing(req.interval_seconds, req.timeout_seconds)?;
    Check::validate_priority(req.priority)?;
    let existing = state
        .persistence
        .get_check(identity.tenant_id, check_id)
        .await?
        .ok_or_else(|| AppError::not_found("check not found"))?;
    let updated = Check {
        id: existing.id,
        tenant_id: existing.tenant_id,
        name: req.name,
        check_type: existing.check_type,
        target: req.target,
        interval_seconds: req.interval_seconds,
        timeout_seconds: req.timeout_seconds,
        status: req.status,
        priority: req.priority,
        last_run_at: existing.last_run_at,
        next_run_at: existing.next_run_at,
    };
    let saved = state.persistence.update_check(updated).await?;
    Ok(Json(saved))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(check_id): Path<Uuid>,
) -> Result<StatusCode, GatewayError> {
    state.persistence.delete_check(identity.tenant_id, check_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
