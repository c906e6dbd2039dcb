/// Persistence layer: task and status storage on libsql (SQLite).
pub mod migrations;
pub mod repository;

pub use repository::{LibsqlTaskStore, TaskStore};

use anyhow::Result;

use crate::pool::LibsqlPool;

/// Initialize the database schema.
pub async fn initialize(pool: &LibsqlPool) -> Result<()> {
    let conn = pool.get().await?;
    migrations::run_migrations(&conn).await
}
