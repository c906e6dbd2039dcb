/// Monitoring decision engine
///
/// This module is responsible for:
/// - Probing TCP reachability of host:port targets
/// - Throttling redundant polls of a shared target
/// - Driving the per-task status state machine and transition notifications
/// - Refining the check cadence when the grace time is shorter than the
///   cron interval
pub mod engine;
pub mod grace;
pub mod probe;
pub mod schedule;
pub mod throttle;


pub use engine::MonitorEngine;
pub use probe::TcpProber;
pub use schedule::TriggerScheduler;
