//! Outbound webhook delivery.

use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

/// Per-request timeout for webhook delivery
pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts JSON payloads to user-supplied URLs.
///
/// Delivery is best effort: failures are logged and reported as `false`,
/// never propagated.
#[derive(Clone)]
pub struct WebhookDispatcher {
    client: Client,
}

impl WebhookDispatcher {
    /// Dispatcher with the default timeout.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_timeout(WEBHOOK_TIMEOUT)
    }

    /// Dispatcher with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
        })
    }

    /// POSTs `payload` to `url`; true only for a 2xx answer.
    pub async fn dispatch<T>(&self, url: &str, payload: &T) -> bool
    where
        T: Serialize + Sync,
    {
        match self.client.post(url).json(payload).send().await {
            Ok(resp) if resp.status().is_success() => {
                tracing::info!(url, status = %resp.status(), "Webhook delivered");
                true
            }
            Ok(resp) => {
                tracing::warn!(url, status = %resp.status(), "Webhook rejected");
                false
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "Webhook delivery failed");
                false
            }
        }
    }
}
