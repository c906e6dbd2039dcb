use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use url::Url;

use crate::database::TaskStore;
use crate::error::ServiceError;
use crate::models::{MonitorTask, TaskStatus};
use crate::monitoring::{TriggerScheduler, grace};

/// Task administration surface: create, start, stop, delete, list.
///
/// All schedule changes flow through here so the grace-period cadence
/// refinement is recomputed whenever a task is created or restarted.
pub struct TaskManager {
    store: Arc<dyn TaskStore>,
    scheduler: Arc<TriggerScheduler>,
}

/// Listing entry: the task plus whether its trigger is currently live.
#[derive(Debug, Serialize)]
pub struct TaskSummary {
    #[serde(flatten)]
    pub task: MonitorTask,
    pub scheduled: bool,
}

#[derive(Debug, Serialize)]
pub struct TaskPage {
    pub entries: Vec<TaskSummary>,
    pub page: u32,
    pub size: u32,
    pub total: u64,
}

impl TaskManager {
    pub fn new(store: Arc<dyn TaskStore>, scheduler: Arc<TriggerScheduler>) -> Self {
        Self { store, scheduler }
    }

    /// Validate, persist with a blank status, and schedule a new task.
    pub async fn create(&self, mut task: MonitorTask) -> Result<MonitorTask, ServiceError> {
        validate_task(&task)?;

        let now = Utc::now();
        task.id = None;
        task.enabled = true;
        task.created_at = now;
        task.updated_at = now;

        let id = self.store.save_task(&task).await?;
        task.id = Some(id);
        self.store.save_status(&TaskStatus::blank(id, &task.host, task.port)).await?;

        self.schedule_task(&task)?;

        tracing::info!(task_id = id, name = %task.name, "task created and scheduled");
        Ok(task)
    }

    /// (Re)schedule the trigger for a stopped or restarted task.
    pub async fn start(&self, id: i64) -> Result<MonitorTask, ServiceError> {
        let mut task = self.require(id).await?;

        if !task.enabled {
            task.enabled = true;
            task.updated_at = Utc::now();
            self.store.save_task(&task).await?;
        }
        self.schedule_task(&task)?;

        tracing::info!(task_id = id, "task started");
        Ok(task)
    }

    /// Cancel future ticks; the task and its status remain stored.
    pub async fn stop(&self, id: i64) -> Result<MonitorTask, ServiceError> {
        let mut task = self.require(id).await?;

        self.scheduler.cancel(id);
        if task.enabled {
            task.enabled = false;
            task.updated_at = Utc::now();
            self.store.save_task(&task).await?;
        }

        tracing::info!(task_id = id, "task stopped");
        Ok(task)
    }

    pub async fn delete(&self, id: i64) -> Result<MonitorTask, ServiceError> {
        let task = self.require(id).await?;

        self.scheduler.cancel(id);
        self.store.delete_task(id).await?;

        tracing::info!(task_id = id, "task deleted");
        Ok(task)
    }

    pub async fn get(&self, id: i64) -> Result<MonitorTask, ServiceError> {
        self.require(id).await
    }

    pub async fn list(&self, page: u32, size: u32) -> Result<TaskPage, ServiceError> {
        let size = size.clamp(1, 200);
        let offset = u64::from(page) * u64::from(size);

        let tasks = self.store.list_tasks(offset, u64::from(size)).await?;
        let total = self.store.count_tasks().await?;

        let entries = tasks
            .into_iter()
            .map(|task| {
                let scheduled = task.id.is_some_and(|id| self.scheduler.exists(id));
                TaskSummary { task, scheduled }
            })
            .collect();

        Ok(TaskPage { entries, page, size, total })
    }

    /// Reschedule every enabled task. Triggers are not durable, so this
    /// runs once at boot.
    pub async fn resume_all(&self) -> Result<usize, ServiceError> {
        let mut resumed = 0;
        for task in self.store.all_tasks().await? {
            if !task.enabled {
                continue;
            }
            match self.schedule_task(&task) {
                Ok(()) => resumed += 1,
                Err(error) => {
                    tracing::warn!(task_id = ?task.id, %error, "failed to resume task");
                }
            }
        }
        Ok(resumed)
    }

    async fn require(&self, id: i64) -> Result<MonitorTask, ServiceError> {
        self.store.get_task(id).await?.ok_or(ServiceError::TaskNotFound(id))
    }

    fn schedule_task(&self, task: &MonitorTask) -> Result<(), ServiceError> {
        let id = task.id.ok_or_else(|| ServiceError::InvalidTask("task has no id".into()))?;
        let refine = grace::refine_cadence(&task.cron_expr, task.grace_secs)?;
        self.scheduler.schedule(id, &task.cron_expr, refine)
    }
}

fn validate_task(task: &MonitorTask) -> Result<(), ServiceError> {
    if task.name.trim().is_empty() {
        return Err(ServiceError::InvalidTask("name must not be empty".into()));
    }
    if task.host.trim().is_empty() {
        return Err(ServiceError::InvalidTask("host must not be empty".into()));
    }
    if task.port == 0 {
        return Err(ServiceError::InvalidTask("port must be between 1 and 65535".into()));
    }

    grace::parse_schedule(&task.cron_expr)?;

    match (task.outage_from, task.outage_to) {
        (None, None) => {}
        (Some(from), Some(to)) if from < to => {}
        (Some(_), Some(_)) => {
            return Err(ServiceError::InvalidTask(
                "outage window must start before it ends".into(),
            ));
        }
        _ => {
            return Err(ServiceError::InvalidTask(
                "outage window needs both start and end".into(),
            ));
        }
    }

    match Url::parse(&task.notify_addr) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        Ok(url) => Err(ServiceError::InvalidTask(format!(
            "unsupported notification scheme: {}",
            url.scheme()
        ))),
        Err(error) => {
            Err(ServiceError::InvalidTask(format!("invalid notification address: {error}")))
        }
    }
}
