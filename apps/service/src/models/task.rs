use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Last known reachability of a monitored target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    /// Never evaluated.
    Unknown,
    Active,
    Inactive,
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceState::Unknown => write!(f, "unknown"),
            ServiceState::Active => write!(f, "active"),
            ServiceState::Inactive => write!(f, "inactive"),
        }
    }
}

impl ServiceState {
    pub fn from_code(code: &str) -> Self {
        match code {
            "active" => ServiceState::Active,
            "inactive" => ServiceState::Inactive,
            _ => ServiceState::Unknown,
        }
    }
}

/// A monitored host:port target and its notification policy.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorTask {
    pub id: Option<i64>,
    pub name: String,
    pub host: String,
    pub port: u16,
    /// Cron expression with a seconds field, e.g. `0 */5 * * * *`.
    pub cron_expr: String,
    /// Minimum continuous-down seconds before a down notification fires.
    pub grace_secs: u32,
    pub outage_from: Option<DateTime<Utc>>,
    pub outage_to: Option<DateTime<Utc>>,
    /// Webhook URL that receives transition notifications.
    pub notify_addr: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MonitorTask {
    /// True while `now` falls strictly inside the declared outage window.
    pub fn in_outage_window(&self, now: DateTime<Utc>) -> bool {
        match (self.outage_from, self.outage_to) {
            (Some(from), Some(to)) => now > from && now < to,
            _ => false,
        }
    }
}

/// Per-task evaluation status, owned 1:1 by its task.
///
/// `host` and `port` are duplicated from the task at evaluation time so
/// that statuses can be looked up by shared target for poll throttling.
#[derive(Debug, Clone, Serialize)]
pub struct TaskStatus {
    pub task_id: i64,
    pub host: String,
    pub port: u16,
    pub state: ServiceState,
    /// First unreachable probe time of the current continuous outage.
    /// `None` while the target is confirmed up.
    pub last_failed_at: Option<DateTime<Utc>>,
    /// A down notification has been emitted for the current outage.
    pub down_notified: bool,
    /// Time of the most recent real probe; the throttle's only signal.
    pub updated_at: DateTime<Utc>,
}

impl TaskStatus {
    /// Status for a task that has never been evaluated. `updated_at` sits
    /// at the epoch so a freshly created task never throttles itself.
    pub fn blank(task_id: i64, host: &str, port: u16) -> Self {
        Self {
            task_id,
            host: host.to_string(),
            port,
            state: ServiceState::Unknown,
            last_failed_at: None,
            down_notified: false,
            updated_at: DateTime::UNIX_EPOCH,
        }
    }
}

pub fn timestamp_to_i64(ts: DateTime<Utc>) -> i64 {
    ts.timestamp()
}

pub fn i64_to_timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn outage_window_bounds_are_strict() {
        let from = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2025, 6, 1, 1, 0, 0).unwrap();
        let task = MonitorTask {
            id: Some(1),
            name: "edge".into(),
            host: "localhost".into(),
            port: 8080,
            cron_expr: "0 * * * * *".into(),
            grace_secs: 0,
            outage_from: Some(from),
            outage_to: Some(to),
            notify_addr: "http://localhost/hook".into(),
            enabled: true,
            created_at: from,
            updated_at: from,
        };

        assert!(!task.in_outage_window(from));
        assert!(!task.in_outage_window(to));
        assert!(task.in_outage_window(from + chrono::Duration::minutes(30)));
    }

    #[test]
    fn state_codes_round_trip() {
        for state in [ServiceState::Unknown, ServiceState::Active, ServiceState::Inactive] {
            assert_eq!(ServiceState::from_code(&state.to_string()), state);
        }
        assert_eq!(ServiceState::from_code(""), ServiceState::Unknown);
    }
}
