pub mod api_key;
pub mod check;
pub mod check_result;
pub mod incident;
pub mod incident_event;
pub mod schedule;
pub mod session;
pub mod task;
pub mod tenant;
pub mod user;

pub use api_key::{ApiKey, MIN_KEY_LENGTH, MIN_SECRET_LENGTH};
pub use check::{Check, CheckStatus, CheckType, MAX_INTERVAL_SECONDS, MAX_TIMEOUT_SECONDS, MIN_INTERVAL_SECONDS, MIN_TIMEOUT_SECONDS};
pub use check_result::CheckResult;
pub use incident::{Incident, IncidentStatus, Severity};
pub use incident_event::{IncidentEvent, IncidentEventType};
pub use schedule::Schedule;
pub use session::Session;
pub use task::Task;
pub use tenant::Tenant;
pub use user::User;
