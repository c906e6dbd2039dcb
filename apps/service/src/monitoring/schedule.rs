use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use cron::Schedule;
use tokio::task::JoinHandle;

use super::engine::MonitorEngine;
use super::grace;
use crate::error::ServiceError;

/// Trigger scheduler - one tokio task per scheduled monitor.
///
/// Each trigger loop awaits its evaluation before sleeping again, so ticks
/// for a given task never overlap. When a refinement spacing is set (grace
/// shorter than the cron interval), intermediate ticks fire between cron
/// deadlines at that spacing.
pub struct TriggerScheduler {
    engine: Arc<MonitorEngine>,
    triggers: Mutex<HashMap<i64, JoinHandle<()>>>,
}

impl TriggerScheduler {
    pub fn new(engine: Arc<MonitorEngine>) -> Self {
        Self { engine, triggers: Mutex::new(HashMap::new()) }
    }

    /// Register (or replace) the trigger for a task.
    pub fn schedule(
        &self,
        task_id: i64,
        cron_expr: &str,
        refine: Option<Duration>,
    ) -> Result<(), ServiceError> {
        let schedule = grace::parse_schedule(cron_expr)?;

        // Replacing an existing trigger cancels the old loop first.
        self.cancel(task_id);

        let engine = self.engine.clone();
        let handle = tokio::spawn(async move {
            run_trigger(engine, task_id, schedule, refine).await;
        });

        self.triggers.lock().unwrap().insert(task_id, handle);
        tracing::info!(task_id, cron_expr, ?refine, "trigger scheduled");
        Ok(())
    }

    /// Cancel future ticks for a task. An in-flight evaluation completes;
    /// abort points sit between ticks.
    pub fn cancel(&self, task_id: i64) -> bool {
        match self.triggers.lock().unwrap().remove(&task_id) {
            Some(handle) => {
                handle.abort();
                tracing::info!(task_id, "trigger cancelled");
                true
            }
            None => false,
        }
    }

    pub fn exists(&self, task_id: i64) -> bool {
        self.triggers
            .lock()
            .unwrap()
            .get(&task_id)
            .is_some_and(|handle| !handle.is_finished())
    }
}

async fn run_trigger(
    engine: Arc<MonitorEngine>,
    task_id: i64,
    schedule: Schedule,
    refine: Option<Duration>,
) {
    loop {
        let Some(deadline) = schedule.after(&Utc::now()).next() else {
            tracing::info!(task_id, "cron schedule exhausted, trigger stopping");
            break;
        };

        if let Some(spacing) = refine {
            loop {
                let remaining = (deadline - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                if remaining <= spacing {
                    break;
                }
                tokio::time::sleep(spacing).await;
                tick(&engine, task_id).await;
            }
        }

        let remaining = (deadline - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        tokio::time::sleep(remaining).await;
        tick(&engine, task_id).await;
    }
}

async fn tick(engine: &MonitorEngine, task_id: i64) {
    match engine.evaluate(task_id).await {
        Ok(status) => {
            tracing::debug!(task_id, state = %status.state, "tick evaluated");
        }
        Err(ServiceError::TaskNotFound(_)) => {
            tracing::warn!(task_id, "task no longer exists, skipping tick");
        }
        Err(error) => {
            // Failed ticks are not re-driven; the next fire is the retry.
            tracing::warn!(task_id, %error, "tick failed");
        }
    }
}
