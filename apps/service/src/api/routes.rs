use actix_web::{HttpResponse, Responder, get, post, web};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{failure, success};
use crate::models::MonitorTask;
use crate::tasks::TaskManager;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_task)
        .service(find_task)
        .service(find_tasks)
        .service(start_task)
        .service(stop_task)
        .service(delete_task)
        .service(health_route);
}

/// Request body for task creation; server-owned fields are not accepted.
#[derive(Debug, Deserialize)]
pub struct CreateTask {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub cron_expr: String,
    #[serde(default)]
    pub grace_secs: u32,
    #[serde(default)]
    pub outage_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub outage_to: Option<DateTime<Utc>>,
    pub notify_addr: String,
}

impl CreateTask {
    fn into_task(self) -> MonitorTask {
        let now = Utc::now();
        MonitorTask {
            id: None,
            name: self.name,
            host: self.host,
            port: self.port,
            cron_expr: self.cron_expr,
            grace_secs: self.grace_secs,
            outage_from: self.outage_from,
            outage_to: self.outage_to,
            notify_addr: self.notify_addr,
            enabled: true,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub size: u32,
}

fn default_page_size() -> u32 {
    20
}

#[post("/create")]
async fn create_task(
    manager: web::Data<TaskManager>,
    payload: web::Json<CreateTask>,
) -> impl Responder {
    match manager.create(payload.into_inner().into_task()).await {
        Ok(task) => success("task created and scheduled", task),
        Err(error) => {
            tracing::error!(%error, "failed to create task");
            failure(format!("failed to create task: {error}"))
        }
    }
}

#[get("/findone/{id}")]
async fn find_task(manager: web::Data<TaskManager>, id: web::Path<i64>) -> impl Responder {
    let id = id.into_inner();
    match manager.get(id).await {
        Ok(task) => success("task found", task),
        Err(error) => {
            tracing::error!(task_id = id, %error, "failed to retrieve task");
            failure(format!("failed to find task with id {id}"))
        }
    }
}

#[get("/findall")]
async fn find_tasks(manager: web::Data<TaskManager>, query: web::Query<ListQuery>) -> impl Responder {
    match manager.list(query.page, query.size).await {
        Ok(page) => success("tasks retrieved", page),
        Err(error) => {
            tracing::error!(%error, "failed to list tasks");
            failure("failed to list tasks".to_string())
        }
    }
}

#[get("/start/{id}")]
async fn start_task(manager: web::Data<TaskManager>, id: web::Path<i64>) -> impl Responder {
    let id = id.into_inner();
    match manager.start(id).await {
        Ok(task) => success("task started", task),
        Err(error) => {
            tracing::error!(task_id = id, %error, "failed to start task");
            failure(format!("failed to start task with id {id}"))
        }
    }
}

#[get("/stop/{id}")]
async fn stop_task(manager: web::Data<TaskManager>, id: web::Path<i64>) -> impl Responder {
    let id = id.into_inner();
    match manager.stop(id).await {
        Ok(task) => success("task stopped", task),
        Err(error) => {
            tracing::error!(task_id = id, %error, "failed to stop task");
            failure(format!("failed to stop task with id {id}"))
        }
    }
}

#[get("/delete/{id}")]
async fn delete_task(manager: web::Data<TaskManager>, id: web::Path<i64>) -> impl Responder {
    let id = id.into_inner();
    match manager.delete(id).await {
        Ok(task) => success("task deleted", task),
        Err(error) => {
            tracing::error!(task_id = id, %error, "failed to delete task");
            failure(format!("failed to delete task with id {id}"))
        }
    }
}

/// Health check route
/// This route returns no content, the response status is enough.
#[get("/health")]
async fn health_route() -> impl Responder {
    HttpResponse::Ok()
}
