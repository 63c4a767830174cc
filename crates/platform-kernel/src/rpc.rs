//! The auxiliary backend traits named in the permission table
//! (`NotificationService`, `MetricsService`, `ForgeService`) but never
//! detailed further. Kept thin and typed so the gateway's fan-out/
//! permission logic has a real backend to dispatch to, without inventing
//! unspecified business logic.
//!
//! Swapping any of these for a networked client later only changes the
//! innermost call inside each trait method; the resilience wrapper in
//! `platform-gateway` already treats in-process calls exactly like RPCs.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub tenant_id: Uuid,
    pub channel: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationReceipt {
    pub id: Uuid,
    pub accepted_at: DateTime<Utc>,
}

/// Outbound alert delivery.
#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn send(&self, request: NotificationRequest) -> Result<NotificationReceipt, AppError>;
}

/// Logs the notification instead of delivering it; delivery transports
/// (email, SMS, webhook) are an external collaborator.
pub struct LoggingNotificationService;

#[async_trait]
impl NotificationService for LoggingNotificationService {
    async fn send(&self, request: NotificationRequest) -> Result<NotificationReceipt, AppError> {
        tracing::info!(
            tenant_id = %request.tenant_id,
            channel = %request.channel,
            subject = %request.subject,
            "notification dispatched"
        );
        Ok(NotificationReceipt { id: Uuid::new_v4(), accepted_at: Utc::now() })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSample {
    pub name: String,
    pub value: f64,
}

/// Minimal counters/gauges surface. Exporting to a real time-series backend (Prometheus,
/// etc.) is ambient-stack plumbing left to the deployer, not this crate.
#[async_trait]
pub trait MetricsService: Send + Sync {
    async fn record(&self, sample: MetricSample) -> Result<(), AppError>;
    async fn snapshot(&self) -> Result<Vec<MetricSample>, AppError>;
}

#[derive(Default)]
pub struct InMemoryMetricsService {
    samples: Mutex<Vec<MetricSample>>,
}

impl InMemoryMetricsService {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetricsService for InMemoryMetricsService {
    async fn record(&self, sample: MetricSample) -> Result<(), AppError> {
        self.samples.lock().unwrap_or_else(|p| p.into_inner()).push(sample);
        Ok(())
    }

    async fn snapshot(&self) -> Result<Vec<MetricSample>, AppError> {
        Ok(self.samples.lock().unwrap_or_else(|p| p.into_inner()).clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgeRequest {
    pub tenant_id: Uuid,
    pub operation: String,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgeReceipt {
    pub accepted: bool,
    pub message: String,
}

/// Tenant-initiated provisioning/automation hook named in the permission
/// table (`forge:write`) but left undetailed by the distillation. Accepts
/// any operation and echoes it back; the actual automation backend is an
/// external collaborator.
#[async_trait]
pub trait ForgeService: Send + Sync {
    async fn dispatch(&self, request: ForgeRequest) -> Result<ForgeReceipt, AppError>;
}

pub struct EchoForgeService;

#[async_trait]
impl ForgeService for EchoForgeService {
    async fn dispatch(&self, request: ForgeRequest) -> Result<ForgeReceipt, AppError> {
        tracing::info!(tenant_id = %request.tenant_id, operation = %request.operation, "forge operation accepted");
        Ok(ForgeReceipt { accepted: true, message: format!("accepted: {}", request.operation) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn logging_notification_service_returns_receipt() {
        let svc = LoggingNotificationService;
        let receipt = svc
            .send(NotificationRequest {
                tenant_id: Uuid::new_v4(),
                channel: "email".into(),
                subject: "check down".into(),
                body: "homepage is failing".into(),
            })
            .await
            .unwrap();
        assert!(receipt.accepted_at <= Utc::now());
    }

    #[tokio::test]
    async fn in_memory_metrics_service_accumulates_samples() {
        let svc = InMemoryMetricsService::new();
        svc.record(MetricSample { name: "checks.executed".into(), value: 1.0 }).await.unwrap();
        svc.record(MetricSample { name: "checks.executed".into(), value: 1.0 }).await.unwrap();
        assert_eq!(svc.snapshot().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn echo_forge_service_accepts_any_operation() {
        let svc = EchoForgeService;
        let receipt = svc
            .dispatch(ForgeRequest { tenant_id: Uuid::new_v4(), operation: "rebuild-index".into(), payload: serde_json::json!({}) })
            .await
            .unwrap();
        assert!(receipt.accepted);
    }
}
