use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum IncidentStatus {
    Open,
    Acknowledged,
    Resolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Warning,
    Error,
    Critical,
}

/// A deduplicated run of failures for a single check. Identity is `(check_id, error_hash)`;
/// while an incident is OPEN or ACKNOWLEDGED, further matching failures
/// bump `count` and `last_seen` instead of creating a new row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Incident {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub check_id: Uuid,
    pub error_message: String,
    pub error_hash: String,
    pub status: IncidentStatus,
    pub severity: Severity,
    pub count: i64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub acknowledged_by: Option<Uuid>,
}

impl Incident {
    pub fn is_open_family(&self) -> bool {
        matches!(
            self.status,
            IncidentStatus::Open | IncidentStatus::Acknowledged
        )
    }

    /// Whether a resolved incident falls within the reopen window measured
    /// from `resolved_at`.
    pub fn within_reopen_window(&self, now: DateTime<Utc>, reopen_window: chrono::Duration) -> bool {
        match self.resolved_at {
            Some(resolved_at) => now - resolved_at <= reopen_window,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incident(status: IncidentStatus, resolved_at: Option<DateTime<Utc>>) -> Incident {
        Incident {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            check_id: Uuid::new_v4(),
            error_message: "connection refused".into(),
            error_hash: "h".into(),
            status,
            severity: Severity::Error,
            count: 1,
            first_seen: Utc::now(),
            last_seen: Utc::now(),
            resolved_at,
            acknowledged_at: None,
            acknowledged_by: None,
        }
    }

    #[test]
    fn open_and_acknowledged_are_open_family() {
        assert!(incident(IncidentStatus::Open, None).is_open_family());
        assert!(incident(IncidentStatus::Acknowledged, None).is_open_family());
        assert!(!incident(IncidentStatus::Resolved, Some(Utc::now())).is_open_family());
    }

    #[test]
    fn reopen_window_respected() {
        let resolved_at = Utc::now() - chrono::Duration::seconds(10);
        let inc = incident(IncidentStatus::Resolved, Some(resolved_at));
        assert!(inc.within_reopen_window(Utc::now(), chrono::Duration::seconds(30)));
        assert!(!inc.within_reopen_window(Utc::now(), chrono::Duration::seconds(5)));
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Critical);
    }
}
