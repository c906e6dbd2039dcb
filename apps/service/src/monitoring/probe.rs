use std::time::{Duration, Instant};

use tokio::net::TcpStream;
use tokio::time::timeout;

/// Outcome of a reachability probe. Probing never fails: every connection
/// error, refusal, or timeout collapses to `Unreachable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Reachable { latency_ms: u64 },
    Unreachable,
}

/// Prober trait so the engine can be exercised without real sockets.
#[async_trait::async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, host: &str, port: u16) -> ProbeOutcome;
}

/// TCP-connect prober with a bounded timeout.
pub struct TcpProber {
    timeout_duration: Duration,
}

impl TcpProber {
    pub fn new(timeout_seconds: u64) -> Self {
        Self { timeout_duration: Duration::from_secs(timeout_seconds) }
    }
}

#[async_trait::async_trait]
impl Prober for TcpProber {
    async fn probe(&self, host: &str, port: u16) -> ProbeOutcome {
        let start = Instant::now();
        let addr = format!("{host}:{port}");

        // The stream is dropped on every path, releasing the socket.
        match timeout(self.timeout_duration, TcpStream::connect(&addr)).await {
            Ok(Ok(_stream)) => {
                let latency_ms = start.elapsed().as_millis() as u64;
                tracing::debug!(host, port, latency_ms, "target reachable");
                ProbeOutcome::Reachable { latency_ms }
            }
            Ok(Err(error)) => {
                tracing::debug!(host, port, %error, "target unreachable");
                ProbeOutcome::Unreachable
            }
            Err(_) => {
                tracing::debug!(host, port, "probe timed out");
                ProbeOutcome::Unreachable
            }
        }
    }
}
