use thiserror::Error;

/// Service-level error taxonomy.
///
/// Probe failures never appear here: an unreachable target is a valid
/// monitoring outcome, not an error. Notification delivery failures are
/// logged and swallowed at the bridge.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("task not found with id {0}")]
    TaskNotFound(i64),
    #[error("repository failure: {0:#}")]
    Repository(#[from] anyhow::Error),
    #[error("invalid cron expression {expr:?}: {source}")]
    InvalidCron {
        expr: String,
        #[source]
        source: cron::error::Error,
    },
    #[error("invalid task: {0}")]
    InvalidTask(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("{0:#}")]
    Io(#[from] std::io::Error),
}
