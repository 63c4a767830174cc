//! `/api/v1/notifications`: fans a send
//! request out to the notification backend.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use platform_kernel::rpc::{NotificationReceipt, NotificationRequest};
use platform_kernel::Identity;
use serde::Deserialize;

use crate::errors::GatewayError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SendNotificationRequest {
    pub channel: String,
    pub subject: String,
    pub body: String,
}

pub async fn send(
    State(state): State<Arc<AppState>>,
    axum::extract::Extension(identity): axum::extract::Extension<Identity>,
    Json(req): Json<SendNotificationRequest>,
) -> Result<(StatusCode, Json<NotificationReceipt>), GatewayError> {
    let notifications = state.notifications.clone();
    let request = NotificationRequest {
        tenant_id: identity.tenant_id,
        channel: req.channel,
        subject: req.subject,
        body: req.body,
    };
    let receipt = state
        .notifications_backend
        .call(|| {
            let notifications = notifications.clone();
            let request = request.clone();
            async move { notifications.send(request).await }
        })
        .await?;
    Ok((StatusCode::ACCEPTED, Json(receipt)))
}
