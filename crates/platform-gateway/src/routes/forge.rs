//! `/api/v1/forge`: dispatches a
//! tenant-initiated automation operation to the forge backend.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use platform_kernel::rpc::{ForgeReceipt, ForgeRequest};
use platform_kernel::Identity;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::GatewayError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ForgeDispatchRequest {
    pub operation: String,
    #[serde(default)]
    pub payload: Value,
}

pub async fn dispatch(
    State(state): State<Arc<AppState>>,
    axum::extract::Extension(identity): axum::extract::Extension<Identity>,
    Json(req): Json<ForgeDispatchRequest>,
) -> Result<(StatusCode, Json<ForgeReceipt>), GatewayError> {
    let forge = state.forge.clone();
    let request = ForgeRequest { tenant_id: identity.tenant_id, operation: req.operation, payload: req.payload };
    let receipt = state
        .forge_backend
        .call(|| {
            let forge = forge.clone();
            let request = request.clone();
            async move { forge.dispatch(request).await }
        })
        .await?;
    Ok((StatusCode::ACCEPTED, Json(receipt)))
}
