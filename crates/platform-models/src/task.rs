use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::check::CheckType;

/// A single dispatch unit handed from the scheduler to an executor. Tasks
/// are never persisted; they exist only on the in-memory priority queue
///.
#[derive(Debug, Clone)]
pub struct Task {
    pub check_id: Uuid,
    pub tenant_id: Uuid,
    pub check_type: CheckType,
    pub target: String,
    pub timeout_seconds: i64,
    pub priority: i16,
    pub scheduled_for: DateTime<Utc>,
}

impl Task {
    /// Ordering key for the scheduler's priority queue: lower `priority`
    /// numbers dispatch first; ties broken by the earliest `scheduled_for`.
    pub fn dispatch_key(&self) -> (i16, DateTime<Utc>) {
        (self.priority, self.scheduled_for)
    }
}
