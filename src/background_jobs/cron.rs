//! Cron-expression evaluation for [`JobSchedule::Cron`]/[`JobSchedule::Combined`].
//!
//! Expressions are parsed once, at job registration, rather than on
//! every scheduler tick: `cron::Schedule::from_str` is not free, and a
//! job's expression never changes after registration.

use chrono::{DateTime, Utc};
use cron::Schedule;
use std::str::FromStr;

/// Parse a cron expression. Returns `None` (rather than erroring out
/// job registration) on anything invalid — the caller logs a warning
/// once and the job falls back to running only via its other triggers
/// (interval/hook/manual).
pub fn parse(expr: &str) -> Option<Schedule> {
    Schedule::from_str(expr).ok()
}

/// The next run time strictly after `after`.
pub fn next_after(schedule: &Schedule, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    schedule.after(&after).next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_standard_six_field_expression() {
        assert!(parse("0 0 3 * * *").is_some());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse("not a cron expression").is_none());
    }

    #[test]
    fn next_after_advances_past_the_reference_time() {
        let schedule = parse("0 0 3 * * *").unwrap();
        let now = Utc::now();
        let next = next_after(&schedule, now).unwrap();
        assert!(next > now);
    }
}
