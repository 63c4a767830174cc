use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum IncidentEventType {
    Created,
    Updated,
    Acknowledged,
    Resolved,
    Reopened,
}

/// Append-only audit trail entry for an incident's state transitions
///. Never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct IncidentEvent {
    pub id: Uuid,
    pub incident_id: Uuid,
    pub event_type: IncidentEventType,
    pub message: String,
    /// `None` means the transition was made by the system (an automatic
    /// resolve or dedup bump), not a human actor.
    pub actor: Option<Uuid>,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

impl IncidentEvent {
    pub fn new(
        id: Uuid,
        incident_id: Uuid,
        event_type: IncidentEventType,
        message: impl Into<String>,
        actor: Option<Uuid>,
        metadata: Value,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            incident_id,
            event_type,
            message: message.into(),
            actor,
            metadata,
            created_at: now,
        }
    }
}
