//! `/api/v1/config`: reads and updates
//! the calling tenant's settings bag, dispatched straight to the persistence port like `checks`.

use std::sync::Arc;

use axum::extract::{Extension, State};
use axum::Json;
use platform_kernel::{AppError, Identity};
use serde_json::Value;

use crate::errors::GatewayError;
use crate::state::AppState;

pub async fn get(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Value>, GatewayError> {
    let tenant = state
        .persistence
        .get_tenant(identity.tenant_id)
        .await?
        .ok_or_else(|| AppError::not_found("tenant not found"))?;
    Ok(Json(tenant.settings))
}

/// Replaces the whole settings bag. Arbitrary JSON is accepted; the
/// platform only reads the handful of keys it knows about (e.g. the
/// tenant-level rate-limit override).
pub async fn update(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(settings): Json<Value>,
) -> Result<Json<Value>, GatewayError> {
    if !settings.is_object() {
        return Err(AppError::validation("settings must be a JSON object").into());
    }
    let tenant = state.persistence.update_tenant_settings(identity.tenant_id, settings).await?;
    Ok(Json(tenant.settings))
}
