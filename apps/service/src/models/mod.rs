pub mod task;

pub use task::{MonitorTask, ServiceState, TaskStatus};
