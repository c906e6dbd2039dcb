#![warn(clippy::all)]

use std::path::PathBuf;
use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use clap::Parser;

mod api;
mod config;
mod database;
mod error;
mod models;
mod monitoring;
mod notify;
mod pool;
mod tasks;

use config::Config;
use database::{LibsqlTaskStore, TaskStore};
use error::ServiceError;
use logger::init_tracing;
use monitoring::{MonitorEngine, TcpProber, TriggerScheduler};
use notify::WebhookNotifier;
use tasks::TaskManager;

#[derive(Debug, Parser)]
#[command(name = "portwatch-service", about = "Service reachability monitor")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[actix_web::main]
async fn main() -> Result<(), ServiceError> {
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_config(cli.config.as_deref())
        .map_err(|error| ServiceError::Config(error.to_string()))?;

    let pool = pool::build_pool(&config.database.path).await?;
    database::initialize(&pool).await?;

    let store: Arc<dyn TaskStore> = Arc::new(LibsqlTaskStore::new(pool));
    let prober = Arc::new(TcpProber::new(config.probe.timeout_secs));
    let notifier = Arc::new(
        WebhookNotifier::new(config.notify.timeout_secs)
            .map_err(|error| ServiceError::Config(format!("failed to build notifier: {error:#}")))?,
    );

    let engine = Arc::new(MonitorEngine::new(store.clone(), prober, notifier));
    let scheduler = Arc::new(TriggerScheduler::new(engine));
    let manager = web::Data::new(TaskManager::new(store, scheduler));

    let resumed = manager.resume_all().await?;
    tracing::info!(resumed, "rescheduled stored tasks");

    let addr = format!("{}:{}", config.http.bind, config.http.port);
    tracing::info!(%addr, "starting admin api");

    HttpServer::new(move || App::new().app_data(manager.clone()).configure(api::routes))
        .bind(&addr)?
        .run()
        .await?;

    Ok(())
}
