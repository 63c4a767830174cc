//! Liveness/readiness probes: always public, never
//! authenticated, never rate limited.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::state::AppState;

pub async fn health() -> Json<Value> {
    Json(json!({"status": "ok", "timestamp": Utc::now()}))
}

pub async fn live() -> Json<Value> {
    Json(json!({"status": "ok", "timestamp": Utc::now()}))
}

/// Readiness additionally probes the persistence port, the one dependency
/// whose unavailability should pull this instance out of rotation.
pub async fn ready(State(state): State<Arc<AppState>>) -> Json<Value> {
    let db_ok = state
        .persistence
        .get_tenant_by_slug("__readiness_probe__")
        .await
        .is_ok();
    Json(json!({
        "status": if db_ok { "ok" } else { "degraded" },
        "timestamp": Utc::now(),
        "components": {"database": db_ok},
    }))
}
