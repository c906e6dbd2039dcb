use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::probe::{ProbeOutcome, Prober};
use super::throttle;
use crate::database::TaskStore;
use crate::error::ServiceError;
use crate::models::{MonitorTask, ServiceState, TaskStatus};
use crate::notify::Notifier;

/// Per-task monitoring state machine.
///
/// One `evaluate` call per scheduled tick. Collaborators are injected at
/// construction; the engine owns all status mutation for its tasks.
pub struct MonitorEngine {
    store: Arc<dyn TaskStore>,
    prober: Arc<dyn Prober>,
    notifier: Arc<dyn Notifier>,
}

impl MonitorEngine {
    pub fn new(
        store: Arc<dyn TaskStore>,
        prober: Arc<dyn Prober>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self { store, prober, notifier }
    }

    pub async fn evaluate(&self, task_id: i64) -> Result<TaskStatus, ServiceError> {
        self.evaluate_at(task_id, Utc::now()).await
    }

    /// Evaluate one tick at an explicit `now`.
    ///
    /// Short-circuit order: outage window, shared-target throttle, probe.
    /// Suppressed ticks return the stored status untouched; only ticks
    /// that really probe refresh `updated_at` and persist.
    pub async fn evaluate_at(
        &self,
        task_id: i64,
        now: DateTime<Utc>,
    ) -> Result<TaskStatus, ServiceError> {
        tracing::debug!(task_id, "evaluating task");

        let task = self
            .store
            .get_task(task_id)
            .await?
            .ok_or(ServiceError::TaskNotFound(task_id))?;

        let mut status = self
            .store
            .get_status(task_id)
            .await?
            .unwrap_or_else(|| TaskStatus::blank(task_id, &task.host, task.port));

        if task.in_outage_window(now) {
            tracing::info!(task_id, "inside declared outage window, skipping evaluation");
            return Ok(status);
        }

        let peers = self.store.statuses_for_target(&task.host, task.port).await?;
        if !throttle::should_poll(&peers, now) {
            tracing::debug!(
                task_id,
                host = %task.host,
                port = task.port,
                "target polled within the last second, skipping"
            );
            return Ok(status);
        }

        // Re-key the status in case the task's target was edited.
        status.host = task.host.clone();
        status.port = task.port;

        match self.prober.probe(&task.host, task.port).await {
            ProbeOutcome::Reachable { latency_ms } => {
                self.mark_reachable(&task, &mut status, now).await;
                tracing::info!(task_id, host = %task.host, port = task.port, latency_ms, "service is active");
            }
            ProbeOutcome::Unreachable => {
                self.mark_unreachable(&task, &mut status, now).await;
                tracing::info!(task_id, host = %task.host, port = task.port, "service is inactive");
            }
        }

        status.updated_at = now;
        self.store.save_status(&status).await?;

        Ok(status)
    }

    /// Reachable probe: walk into `Active` if needed.
    ///
    /// An "up" notification goes out when the previous outage had been
    /// announced, or on the first-ever confirmation of a new task. A blip
    /// that never crossed the grace threshold is walked back silently.
    async fn mark_reachable(
        &self,
        task: &MonitorTask,
        status: &mut TaskStatus,
        now: DateTime<Utc>,
    ) {
        if status.state == ServiceState::Active {
            return;
        }

        let announce = status.state == ServiceState::Unknown || status.down_notified;
        status.state = ServiceState::Active;
        status.last_failed_at = None;
        status.down_notified = false;

        if announce {
            self.send_notification(
                &task.notify_addr,
                &format!("Service monitor status ACTIVE: {now}"),
                &format!(
                    "Service is reachable at host {} and port {}",
                    task.host, task.port
                ),
            )
            .await;
        }
    }

    /// Unreachable probe: walk into `Inactive`, then notify once the
    /// outage has lasted at least the grace time. A continuing outage is
    /// never re-notified.
    async fn mark_unreachable(
        &self,
        task: &MonitorTask,
        status: &mut TaskStatus,
        now: DateTime<Utc>,
    ) {
        if status.state != ServiceState::Inactive {
            status.state = ServiceState::Inactive;
            status.last_failed_at = Some(now);
            status.down_notified = false;
        }

        let failed_since = status.last_failed_at.unwrap_or(now);
        let elapsed = (now - failed_since).num_seconds();

        if elapsed >= i64::from(task.grace_secs) && !status.down_notified {
            self.send_notification(
                &task.notify_addr,
                &format!("Service monitor status INACTIVE: {now}"),
                &format!(
                    "Service is not reachable at host {} and port {}",
                    task.host, task.port
                ),
            )
            .await;
            status.down_notified = true;
        }
    }

    /// Fire-and-forget bridge to the notifier. Delivery failures are
    /// logged and swallowed; the transition stands either way.
    async fn send_notification(&self, address: &str, subject: &str, body: &str) {
        if let Err(error) = self.notifier.send(address, subject, body).await {
            tracing::warn!(address, %error, "failed to deliver notification");
        }
    }
}
