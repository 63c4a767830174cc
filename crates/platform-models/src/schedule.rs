use chrono::{DateTime, Utc};
use cron::Schedule as CronExpr;
use platform_kernel::AppError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Binds a check to a 5-field cron expression, optionally overriding the
/// check's own priority for dispatch ordering.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Schedule {
    pub id: Uuid,
    pub check_id: Uuid,
    pub tenant_id: Uuid,
    pub cron_expression: String,
    pub is_active: bool,
    pub priority_override: Option<i16>,
    pub next_run_at: Option<DateTime<Utc>>,
}

impl Schedule {
    /// Validates that `expr` parses as a 5-field cron expression and computes
    /// the next fire time strictly after `after`.
    pub fn next_occurrence(
        cron_expression: &str,
        after: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, AppError> {
        let schedule = parse_cron(cron_expression)?;
        schedule
            .after(&after)
            .next()
            .ok_or_else(|| AppError::validation("cron expression has no future occurrences"))
    }
}

/// The `cron` crate expects 6 or 7 fields (it includes seconds); schedules
/// here are conventional 5-field expressions, so a leading `0` seconds
/// field is prepended before parsing.
fn parse_cron(expr: &str) -> Result<CronExpr, AppError> {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(AppError::validation(format!(
            "cron expression must have exactly 5 fields, got {}",
            fields.len()
        )));
    }
    let with_seconds = format!("0 {expr}");
    CronExpr::from_str(&with_seconds)
        .map_err(|e| AppError::validation(format!("invalid cron expression: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn rejects_non_5_field_expression() {
        assert!(Schedule::next_occurrence("* * * * * *", Utc::now()).is_err());
    }

    #[test]
    fn computes_next_minute_boundary() {
        let after = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 30).unwrap();
        let next = Schedule::next_occurrence("* * * * *", after).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 1, 1, 12, 1, 0).unwrap());
    }
}
