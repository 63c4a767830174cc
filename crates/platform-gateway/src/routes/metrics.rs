//! `/api/v1/metrics`: read-only snapshot
//! of the counters/gauges the platform has recorded.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use platform_kernel::rpc::MetricSample;

use crate::errors::GatewayError;
use crate::state::AppState;

pub async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Vec<MetricSample>>, GatewayError> {
    let metrics = state.metrics.clone();
    let samples = state
        .metrics_backend
        .call(|| {
            let metrics = metrics.clone();
            async move { metrics.snapshot().await }
        })
        .await?;
    Ok(Json(samples))
}
