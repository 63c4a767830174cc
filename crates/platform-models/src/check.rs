use chrono::{DateTime, Utc};
use platform_kernel::AppError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CheckType {
    Http,
    Tcp,
    Grpc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Active,
    Paused,
    Disabled,
}

pub const MIN_INTERVAL_SECONDS: i64 = 5;
pub const MAX_INTERVAL_SECONDS: i64 = 86_400;
pub const MIN_TIMEOUT_SECONDS: i64 = 1;
pub const MAX_TIMEOUT_SECONDS: i64 = 300;

/// A monitoring target.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Check {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub check_type: CheckType,
    pub target: String,
    pub interval_seconds: i64,
    pub timeout_seconds: i64,
    pub status: CheckStatus,
    pub priority: i16,
    pub last_run_at: Option<DateTime<Utc>>,
    pub next_run_at: Option<DateTime<Utc>>,
}

impl Check {
    /// Validates the timing invariants: `5 <= interval <= 86400`,
    /// `1 <= timeout <= 300`, `timeout < interval`.
    pub fn validate_timing(interval_seconds: i64, timeout_seconds: i64) -> Result<(), AppError> {
        if !(MIN_INTERVAL_SECONDS..=MAX_INTERVAL_SECONDS).contains(&interval_seconds) {
            return Err(AppError::validation(format!(
                "interval_seconds must be between {MIN_INTERVAL_SECONDS} and {MAX_INTERVAL_SECONDS}, got {interval_seconds}"
            )));
        }
        if !(MIN_TIMEOUT_SECONDS..=MAX_TIMEOUT_SECONDS).contains(&timeout_seconds) {
            return Err(AppError::validation(format!(
                "timeout_seconds must be between {MIN_TIMEOUT_SECONDS} and {MAX_TIMEOUT_SECONDS}, got {timeout_seconds}"
            )));
        }
        if timeout_seconds >= interval_seconds {
            return Err(AppError::validation(format!(
                "timeout_seconds ({timeout_seconds}) must be less than interval_seconds ({interval_seconds})"
            )));
        }
        Ok(())
    }

    pub fn validate_priority(priority: i16) -> Result<(), AppError> {
        if !(1..=4).contains(&priority) {
            return Err(AppError::validation(format!(
                "priority must be between 1 and 4, got {priority}"
            )));
        }
        Ok(())
    }

    pub fn is_eligible_for_dispatch(&self, now: DateTime<Utc>) -> bool {
        self.status == CheckStatus::Active
            && self.next_run_at.map(|next| next <= now).unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_intervals_accepted() {
        assert!(Check::validate_timing(5, 1).is_ok());
        assert!(Check::validate_timing(86_400, 299).is_ok());
    }

    #[test]
    fn interval_below_minimum_rejected() {
        assert!(Check::validate_timing(4, 1).is_err());
    }

    #[test]
    fn interval_above_maximum_rejected() {
        assert!(Check::validate_timing(86_401, 1).is_err());
    }

    #[test]
    fn timeout_not_less_than_interval_rejected() {
        assert!(Check::validate_timing(10, 10).is_err());
        assert!(Check::validate_timing(10, 11).is_err());
    }

    #[test]
    fn priority_out_of_range_rejected() {
        assert!(Check::validate_priority(0).is_err());
        assert!(Check::validate_priority(5).is_err());
        assert!(Check::validate_priority(1).is_ok());
        assert!(Check::validate_priority(4).is_ok());
    }
}
