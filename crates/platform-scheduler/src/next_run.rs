use chrono::{DateTime, Utc};
use platform_models::{Check, Schedule};

/// Computes the next dispatch time for a check after `now`. A present, active
/// schedule's cron expression wins over the check's interval-derived plan.
pub fn compute_next_run(
    check: &Check,
    schedule: Option<&Schedule>,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    if let Some(schedule) = schedule {
        if schedule.is_active {
            if let Ok(next) = Schedule::next_occurrence(&schedule.cron_expression, now) {
                return next;
            }
        }
    }
    now + chrono::Duration::seconds(check.interval_seconds)
}

/// Dispatch priority for a tick batch: a schedule's override wins over the
/// check's own priority when present.
fn effective_priority(check: &Check, schedule: Option<&Schedule>) -> i16 {
    schedule
        .and_then(|s| s.priority_override)
        .unwrap_or(check.priority)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use platform_models::{CheckStatus, CheckType};
    use uuid::Uuid;

    fn check(interval_seconds: i64, priority: i16) -> Check {
        Check {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            name: "homepage".into(),
            check_type: CheckType::Http,
            target: "https://example.com".into(),
            interval_seconds,
            timeout_seconds: 5,
            status: CheckStatus::Active,
            priority,
            last_run_at: None,
            next_run_at: None,
        }
    }

    fn schedule(cron_expression: &str, is_active: bool, priority_override: Option<i16>) -> Schedule {
        Schedule {
            id: Uuid::new_v4(),
            check_id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            cron_expression: cron_expression.into(),
            is_active,
            priority_override,
            next_run_at: None,
        }
    }

    #[test]
    fn falls_back_to_interval_when_no_schedule() {
        let c = check(60, 2);
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(compute_next_run(&c, None, now), now + chrono::Duration::seconds(60));
    }

    #[test]
    fn active_schedule_cron_wins_over_interval() {
        let c = check(3600, 2);
        let s = schedule("* * * * *", true, None);
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 30).unwrap();
        let next = compute_next_run(&c, Some(&s), now);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 1, 1, 0, 1, 0).unwrap());
    }

    #[test]
    fn inactive_schedule_falls_back_to_interval() {
        let c = check(60, 2);
        let s = schedule("* * * * *", false, None);
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(compute_next_run(&c, Some(&s), now), now + chrono::Duration::seconds(60));
    }

    #[test]
    fn schedule_priority_override_wins() {
        let c = check(60, 3);
        let s = schedule("* * * * *", true, Some(1));
        assert_eq!(effective_priority(&c, Some(&s)), 1);
        assert_eq!(effective_priority(&c, None), 3);
    }
}
