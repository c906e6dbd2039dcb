use std::str::FromStr;
use std::time::Duration;

use chrono::Utc;
use cron::Schedule;

use crate::error::ServiceError;

/// Compute the intermediate-tick spacing for a task, if any.
///
/// When the grace time is shorter than the base cron interval, a real
/// outage must still be detected within one grace window, so the trigger
/// fires additional ticks between cron fires at the returned spacing.
/// A grace of zero is clamped to one second, the finest cadence the poll
/// throttle permits anyway.
pub fn refine_cadence(
    cron_expr: &str,
    grace_secs: u32,
) -> Result<Option<Duration>, ServiceError> {
    let schedule = parse_schedule(cron_expr)?;

    let Some(base) = base_interval(&schedule) else {
        return Ok(None);
    };

    let grace = Duration::from_secs(u64::from(grace_secs.max(1)));
    if grace < base { Ok(Some(grace)) } else { Ok(None) }
}

pub fn parse_schedule(cron_expr: &str) -> Result<Schedule, ServiceError> {
    Schedule::from_str(cron_expr)
        .map_err(|source| ServiceError::InvalidCron { expr: cron_expr.to_string(), source })
}

/// Base polling interval, taken as the gap between the next two fires.
fn base_interval(schedule: &Schedule) -> Option<Duration> {
    let mut fires = schedule.upcoming(Utc);
    let first = fires.next()?;
    let second = fires.next()?;
    (second - first).to_std().ok()
}
