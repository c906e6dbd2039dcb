use anyhow::Result;
use async_trait::async_trait;
use libsql::{Row, params};

use crate::models::task::{i64_to_timestamp, timestamp_to_i64};
use crate::models::{MonitorTask, ServiceState, TaskStatus};
use crate::pool::LibsqlPool;

const TASK_COLUMNS: &str = "id, name, host, port, cron_expr, grace_secs, outage_from, outage_to, \
                            notify_addr, enabled, created_at, updated_at";
const STATUS_COLUMNS: &str =
    "task_id, host, port, state, last_failed_at, down_notified, updated_at";

/// Storage contract for tasks and their evaluation statuses.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn get_task(&self, id: i64) -> Result<Option<MonitorTask>>;

    /// Insert or update a task, returning its id.
    async fn save_task(&self, task: &MonitorTask) -> Result<i64>;

    /// Delete a task and its status row.
    async fn delete_task(&self, id: i64) -> Result<()>;

    async fn list_tasks(&self, offset: u64, limit: u64) -> Result<Vec<MonitorTask>>;

    async fn count_tasks(&self) -> Result<u64>;

    /// All tasks, used to reschedule triggers at boot.
    async fn all_tasks(&self) -> Result<Vec<MonitorTask>>;

    async fn get_status(&self, task_id: i64) -> Result<Option<TaskStatus>>;

    async fn save_status(&self, status: &TaskStatus) -> Result<()>;

    /// Statuses of every task watching the given host:port, across owners.
    async fn statuses_for_target(&self, host: &str, port: u16) -> Result<Vec<TaskStatus>>;
}

/// LibSQL-backed task store.
pub struct LibsqlTaskStore {
    pool: LibsqlPool,
}

impl LibsqlTaskStore {
    pub fn new(pool: LibsqlPool) -> Self {
        Self { pool }
    }

    async fn get_conn(&self) -> Result<deadpool::managed::Object<crate::pool::LibsqlManager>> {
        Ok(self.pool.get().await?)
    }
}

fn task_from_row(row: &Row) -> Result<MonitorTask> {
    Ok(MonitorTask {
        id: Some(row.get(0)?),
        name: row.get(1)?,
        host: row.get(2)?,
        port: row.get::<i64>(3)? as u16,
        cron_expr: row.get(4)?,
        grace_secs: row.get::<i64>(5)? as u32,
        outage_from: row.get::<Option<i64>>(6)?.map(i64_to_timestamp),
        outage_to: row.get::<Option<i64>>(7)?.map(i64_to_timestamp),
        notify_addr: row.get(8)?,
        enabled: row.get::<i64>(9)? != 0,
        created_at: i64_to_timestamp(row.get(10)?),
        updated_at: i64_to_timestamp(row.get(11)?),
    })
}

fn status_from_row(row: &Row) -> Result<TaskStatus> {
    let state: String = row.get(3)?;
    Ok(TaskStatus {
        task_id: row.get(0)?,
        host: row.get(1)?,
        port: row.get::<i64>(2)? as u16,
        state: ServiceState::from_code(&state),
        last_failed_at: row.get::<Option<i64>>(4)?.map(i64_to_timestamp),
        down_notified: row.get::<i64>(5)? != 0,
        updated_at: i64_to_timestamp(row.get(6)?),
    })
}

#[async_trait]
impl TaskStore for LibsqlTaskStore {
    async fn get_task(&self, id: i64) -> Result<Option<MonitorTask>> {
        let conn = self.get_conn().await?;
        let mut stmt =
            conn.prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?")).await?;

        let mut rows = stmt.query(params![id]).await?;
        match rows.next().await? {
            Some(row) => Ok(Some(task_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn save_task(&self, task: &MonitorTask) -> Result<i64> {
        let conn = self.get_conn().await?;
        let outage_from = task.outage_from.map(timestamp_to_i64);
        let outage_to = task.outage_to.map(timestamp_to_i64);
        let created_at = timestamp_to_i64(task.created_at);
        let updated_at = timestamp_to_i64(task.updated_at);

        if let Some(id) = task.id {
            conn.execute(
                "UPDATE tasks SET name = ?, host = ?, port = ?, cron_expr = ?, grace_secs = ?, \
                 outage_from = ?, outage_to = ?, notify_addr = ?, enabled = ?, updated_at = ? \
                 WHERE id = ?",
                params![
                    task.name.clone(),
                    task.host.clone(),
                    task.port as i64,
                    task.cron_expr.clone(),
                    task.grace_secs as i64,
                    outage_from,
                    outage_to,
                    task.notify_addr.clone(),
                    if task.enabled { 1 } else { 0 },
                    updated_at,
                    id
                ],
            )
            .await?;
            Ok(id)
        } else {
            conn.execute(
                "INSERT INTO tasks (name, host, port, cron_expr, grace_secs, outage_from, \
                 outage_to, notify_addr, enabled, created_at, updated_at) VALUES (?, ?, ?, ?, ?, \
                 ?, ?, ?, ?, ?, ?)",
                params![
                    task.name.clone(),
                    task.host.clone(),
                    task.port as i64,
                    task.cron_expr.clone(),
                    task.grace_secs as i64,
                    outage_from,
                    outage_to,
                    task.notify_addr.clone(),
                    if task.enabled { 1 } else { 0 },
                    created_at,
                    updated_at
                ],
            )
            .await?;

            Ok(conn.last_insert_rowid())
        }
    }

    async fn delete_task(&self, id: i64) -> Result<()> {
        let conn = self.get_conn().await?;

        conn.execute("DELETE FROM task_status WHERE task_id = ?", params![id]).await?;
        conn.execute("DELETE FROM tasks WHERE id = ?", params![id]).await?;
        Ok(())
    }

    async fn list_tasks(&self, offset: u64, limit: u64) -> Result<Vec<MonitorTask>> {
        let conn = self.get_conn().await?;
        let mut stmt = conn
            .prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY id LIMIT ? OFFSET ?"))
            .await?;

        let mut rows = stmt.query(params![limit as i64, offset as i64]).await?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next().await? {
            tasks.push(task_from_row(&row)?);
        }
        Ok(tasks)
    }

    async fn count_tasks(&self) -> Result<u64> {
        let conn = self.get_conn().await?;
        let mut rows = conn.query("SELECT COUNT(*) FROM tasks", ()).await?;
        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)? as u64),
            None => Ok(0),
        }
    }

    async fn all_tasks(&self) -> Result<Vec<MonitorTask>> {
        let conn = self.get_conn().await?;
        let mut stmt =
            conn.prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY id")).await?;

        let mut rows = stmt.query(()).await?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next().await? {
            tasks.push(task_from_row(&row)?);
        }
        Ok(tasks)
    }

    async fn get_status(&self, task_id: i64) -> Result<Option<TaskStatus>> {
        let conn = self.get_conn().await?;
        let mut stmt = conn
            .prepare(&format!("SELECT {STATUS_COLUMNS} FROM task_status WHERE task_id = ?"))
            .await?;

        let mut rows = stmt.query(params![task_id]).await?;
        match rows.next().await? {
            Some(row) => Ok(Some(status_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn save_status(&self, status: &TaskStatus) -> Result<()> {
        let conn = self.get_conn().await?;
        conn.execute(
            "INSERT INTO task_status (task_id, host, port, state, last_failed_at, down_notified, \
             updated_at) VALUES (?, ?, ?, ?, ?, ?, ?) ON CONFLICT(task_id) DO UPDATE SET host = \
             excluded.host, port = excluded.port, state = excluded.state, last_failed_at = \
             excluded.last_failed_at, down_notified = excluded.down_notified, updated_at = \
             excluded.updated_at",
            params![
                status.task_id,
                status.host.clone(),
                status.port as i64,
                status.state.to_string(),
                status.last_failed_at.map(timestamp_to_i64),
                if status.down_notified { 1 } else { 0 },
                timestamp_to_i64(status.updated_at)
            ],
        )
        .await?;
        Ok(())
    }

    async fn statuses_for_target(&self, host: &str, port: u16) -> Result<Vec<TaskStatus>> {
        let conn = self.get_conn().await?;
        let mut stmt = conn
            .prepare(&format!("SELECT {STATUS_COLUMNS} FROM task_status WHERE host = ? AND port = ?"))
            .await?;

        let mut rows = stmt.query(params![host, port as i64]).await?;
        let mut statuses = Vec::new();
        while let Some(row) = rows.next().await? {
            statuses.push(status_from_row(&row)?);
        }
        Ok(statuses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    async fn test_store() -> Result<(LibsqlTaskStore, TempDir)> {
        let dir = TempDir::new()?;
        let path = dir.path().join("test.db").to_string_lossy().to_string();
        let pool = crate::pool::build_pool(&path).await?;
        crate::database::initialize(&pool).await?;
        Ok((LibsqlTaskStore::new(pool), dir))
    }

    fn sample_task(name: &str, host: &str, port: u16) -> MonitorTask {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        MonitorTask {
            id: None,
            name: name.into(),
            host: host.into(),
            port,
            cron_expr: "0 */5 * * * *".into(),
            grace_secs: 30,
            outage_from: None,
            outage_to: None,
            notify_addr: "http://localhost:9999/hook".into(),
            enabled: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn save_and_get_task_round_trip() -> Result<()> {
        let (store, _dir) = test_store().await?;

        let task = sample_task("db", "db.internal", 5432);
        let id = store.save_task(&task).await?;

        let loaded = store.get_task(id).await?.expect("task should exist");
        assert_eq!(loaded.name, "db");
        assert_eq!(loaded.host, "db.internal");
        assert_eq!(loaded.port, 5432);
        assert_eq!(loaded.grace_secs, 30);
        assert!(loaded.enabled);
        assert_eq!(loaded.created_at, task.created_at);
        Ok(())
    }

    #[tokio::test]
    async fn get_missing_task_returns_none() -> Result<()> {
        let (store, _dir) = test_store().await?;
        assert!(store.get_task(42).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn update_task_keeps_id() -> Result<()> {
        let (store, _dir) = test_store().await?;

        let mut task = sample_task("mail", "mail.internal", 25);
        let id = store.save_task(&task).await?;
        task.id = Some(id);
        task.enabled = false;
        task.grace_secs = 60;
        let saved_id = store.save_task(&task).await?;
        assert_eq!(saved_id, id);

        let loaded = store.get_task(id).await?.expect("task should exist");
        assert!(!loaded.enabled);
        assert_eq!(loaded.grace_secs, 60);
        Ok(())
    }

    #[tokio::test]
    async fn list_tasks_pages_in_order() -> Result<()> {
        let (store, _dir) = test_store().await?;

        for i in 0..5 {
            store.save_task(&sample_task(&format!("task-{i}"), "host", 80)).await?;
        }

        assert_eq!(store.count_tasks().await?, 5);

        let first = store.list_tasks(0, 2).await?;
        let second = store.list_tasks(2, 2).await?;
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 2);
        assert_eq!(first[0].name, "task-0");
        assert_eq!(second[0].name, "task-2");
        Ok(())
    }

    #[tokio::test]
    async fn delete_removes_task_and_status() -> Result<()> {
        let (store, _dir) = test_store().await?;

        let id = store.save_task(&sample_task("web", "web.internal", 443)).await?;
        store.save_status(&TaskStatus::blank(id, "web.internal", 443)).await?;

        store.delete_task(id).await?;
        assert!(store.get_task(id).await?.is_none());
        assert!(store.get_status(id).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn statuses_for_target_filters_by_host_and_port() -> Result<()> {
        let (store, _dir) = test_store().await?;

        let a = store.save_task(&sample_task("a", "shared", 80)).await?;
        let b = store.save_task(&sample_task("b", "shared", 80)).await?;
        let c = store.save_task(&sample_task("c", "other", 80)).await?;

        store.save_status(&TaskStatus::blank(a, "shared", 80)).await?;
        store.save_status(&TaskStatus::blank(b, "shared", 80)).await?;
        store.save_status(&TaskStatus::blank(c, "other", 80)).await?;

        let shared = store.statuses_for_target("shared", 80).await?;
        assert_eq!(shared.len(), 2);
        assert!(shared.iter().all(|s| s.host == "shared" && s.port == 80));
        Ok(())
    }

    #[tokio::test]
    async fn save_status_upserts() -> Result<()> {
        let (store, _dir) = test_store().await?;

        let id = store.save_task(&sample_task("cache", "cache.internal", 6379)).await?;
        let mut status = TaskStatus::blank(id, "cache.internal", 6379);
        store.save_status(&status).await?;

        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        status.state = ServiceState::Inactive;
        status.last_failed_at = Some(now);
        status.down_notified = true;
        status.updated_at = now;
        store.save_status(&status).await?;

        let loaded = store.get_status(id).await?.expect("status should exist");
        assert_eq!(loaded.state, ServiceState::Inactive);
        assert_eq!(loaded.last_failed_at, Some(now));
        assert!(loaded.down_notified);
        assert_eq!(loaded.updated_at, now);
        Ok(())
    }
}
