use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

/// Outcome of executing one check, reported by an executor back to the
/// core/incident pipeline. Feeds incident
/// fingerprinting and `checks.last_run_at`, and is also appended to a
/// per-check history log for the `/core/{check_id}/history` surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub check_id: Uuid,
    pub tenant_id: Uuid,
    pub is_success: bool,
    pub error_message: Option<String>,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
    pub timestamp: DateTime<Utc>,
    pub metadata: Value,
}

impl CheckResult {
    pub fn success(check_id: Uuid, tenant_id: Uuid, duration: Duration, timestamp: DateTime<Utc>) -> Self {
        Self {
            check_id,
            tenant_id,
            is_success: true,
            error_message: None,
            duration,
            timestamp,
            metadata: Value::Null,
        }
    }

    pub fn failure(
        check_id: Uuid,
        tenant_id: Uuid,
        error_message: impl Into<String>,
        duration: Duration,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            check_id,
            tenant_id,
            is_success: false,
            error_message: Some(error_message.into()),
            duration,
            timestamp,
            metadata: Value::Null,
        }
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
