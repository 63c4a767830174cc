use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Isolation unit. Every other entity is owned
/// exclusively by one tenant.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub settings: Value,
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    pub fn new(id: Uuid, name: impl Into<String>, slug: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            slug: slug.into(),
            settings: Value::Object(Default::default()),
            created_at: now,
        }
    }

    /// Typed accessor for the rate-limit override the gateway consults
    ///.
    pub fn rate_limit_override(&self) -> Option<u32> {
        self.settings
            .get("rate_limit_requests_per_minute")
            .and_then(Value::as_u64)
            .map(|v| v as u32)
    }
}
