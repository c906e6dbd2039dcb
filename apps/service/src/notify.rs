use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

/// Outbound notification delivery. Best-effort: callers log and swallow
/// failures, delivery is never allowed to fail an evaluation tick.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, address: &str, subject: &str, body: &str) -> Result<()>;
}

/// Delivers notifications as a JSON POST to the task's webhook address.
pub struct WebhookNotifier {
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(timeout_seconds: u64) -> Result<Self> {
        let client =
            reqwest::Client::builder().timeout(Duration::from_secs(timeout_seconds)).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, address: &str, subject: &str, body: &str) -> Result<()> {
        let payload = serde_json::json!({ "subject": subject, "body": body });

        let response = self.client.post(address).json(&payload).send().await?;
        response.error_for_status()?;

        tracing::info!(address, subject, "notification delivered");
        Ok(())
    }
}
