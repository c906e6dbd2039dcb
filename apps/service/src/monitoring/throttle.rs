use chrono::{DateTime, Utc};

use crate::models::TaskStatus;

/// Decide whether a target may be polled now.
///
/// Multiple independently scheduled tasks can watch the same host:port.
/// A poll is denied when any task sharing the target was evaluated within
/// the same whole-second bucket as `now`; the denied tick skips its probe
/// and leaves its own status untouched. No cached result is reused — the
/// fresh peer evaluation stands in for one.
pub fn should_poll(peer_statuses: &[TaskStatus], now: DateTime<Utc>) -> bool {
    !peer_statuses.iter().any(|status| (now - status.updated_at).num_seconds() == 0)
}
