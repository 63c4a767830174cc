//! `/api/v1/incidents`: read access plus the two
//! operator-driven transitions, acknowledge and resolve, dispatched through
//! the incidents backend's resilience wrapper like every other RPC surface.

use std::sync::Arc;

use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use platform_kernel::{AppError, Identity};
use platform_models::{Incident, IncidentEvent};
use platform_persistence::Pagination;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::GatewayError;
use crate::routes::checks::ListQuery;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct IncidentActionRequest {
    #[serde(default)]
    pub action: IncidentAction,
}

#[derive(Deserialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IncidentAction {
    Acknowledge,
    #[default]
    Resolve,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Incident>>, GatewayError> {
    let incidents = state.incidents.clone();
    let pagination = Pagination { page: query.page, page_size: query.page_size };
    let page = state
        .incidents_backend
        .call(|| {
            let incidents = incidents.clone();
            async move { incidents.list(identity.tenant_id, pagination).await }
        })
        .await?;
    Ok(Json(page.items))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(incident_id): Path<Uuid>,
) -> Result<Json<Incident>, GatewayError> {
    let incidents = state.incidents.clone();
    let incident = state
        .incidents_backend
        .call(|| {
            let incidents = incidents.clone();
            async move { incidents.get(identity.tenant_id, incident_id).await }
        })
        .await?
        .ok_or_else(|| AppError::not_found("incident not found"))?;
    Ok(Json(incident))
}

pub async fn history(
    State(state): State<Arc<AppState>>,
    Path(incident_id): Path<Uuid>,
) -> Result<Json<Vec<IncidentEvent>>, GatewayError> {
    let incidents = state.incidents.clone();
    let events = state
        .incidents_backend
        .call(|| {
            let incidents = incidents.clone();
            async move { incidents.list_events(incident_id).await }
        })
        .await?;
    Ok(Json(events))
}

/// `PUT /api/v1/incidents/{id}`: applies the requested transition. The
/// actor is the calling identity's user, not a client-supplied value.
pub async fn update(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(incident_id): Path<Uuid>,
    Json(req): Json<IncidentActionRequest>,
) -> Result<(StatusCode, Json<Incident>), GatewayError> {
    let incidents = state.incidents.clone();
    let actor = Some(identity.user_id);
    let incident = state
        .incidents_backend
        .call(|| {
            let incidents = incidents.clone();
            async move {
                match req.action {
                    IncidentAction::Acknowledge => incidents.acknowledge(identity.tenant_id, incident_id, actor).await,
                    IncidentAction::Resolve => incidents.resolve(identity.tenant_id, incident_id, actor).await,
                }
            }
        })
        .await?;
    Ok((StatusCode::OK, Json(incident)))
}
