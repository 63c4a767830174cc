use async_trait::async_trait;
use chrono::Utc;
use platform_kernel::{AppError, Clock};
use platform_models::{CheckResult, CheckType};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::probe::probe_for;

/// Public contract for the executor backend.
/// `execute` is the single operation the scheduler's worker pool calls per
/// dispatched task, under a caller-supplied deadline.
#[async_trait]
pub trait CoreService: Send + Sync {
    async fn execute(
        &self,
        check_id: Uuid,
        tenant_id: Uuid,
        check_type: CheckType,
        target: &str,
        timeout: Duration,
    ) -> Result<CheckResult, AppError>;
}

pub struct DefaultCoreService {
    clock: Arc<dyn Clock>,
}

impl DefaultCoreService {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

#[async_trait]
impl CoreService for DefaultCoreService {
    async fn execute(
        &self,
        check_id: Uuid,
        tenant_id: Uuid,
        check_type: CheckType,
        target: &str,
        timeout: Duration,
    ) -> Result<CheckResult, AppError> {
        let probe = probe_for(check_type);
        let outcome = probe.run(target, timeout).await;
        let timestamp = self.clock.now();
        Ok(if outcome.is_success {
            CheckResult::success(check_id, tenant_id, outcome.duration, timestamp)
        } else {
            CheckResult::failure(
                check_id,
                tenant_id,
                outcome.error_message.unwrap_or_else(|| "unknown error".to_string()),
                outcome.duration,
                timestamp,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform_kernel::FakeClock;

    #[tokio::test]
    async fn tcp_probe_against_closed_port_fails() {
        let svc = DefaultCoreService::new(Arc::new(FakeClock::new(Utc::now())));
        let result = svc
            .execute(Uuid::new_v4(), Uuid::new_v4(), CheckType::Tcp, "127.0.0.1:1", Duration::from_millis(200))
            .await
            .unwrap();
        assert!(!result.is_success);
    }

    #[tokio::test]
    async fn grpc_probe_is_unimplemented_stub() {
        let svc = DefaultCoreService::new(Arc::new(FakeClock::new(Utc::now())));
        let result = svc
            .execute(Uuid::new_v4(), Uuid::new_v4(), CheckType::Grpc, "localhost:50051", Duration::from_millis(100))
            .await
            .unwrap();
        assert!(!result.is_success);
    }
}
