//! Low-level webhook POSTs.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{DeliveryError, DeliveryResult};

/// Default webhook request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared JSON POST client for webhook endpoints.
pub struct WebhookSender {
    client: Client,
}

impl WebhookSender {
    /// Creates a sender with the given request timeout.
    pub fn new(timeout: Duration) -> DeliveryResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("upnext/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DeliveryError::client(e.to_string()))?;

        Ok(Self { client })
    }

    /// POSTs a JSON payload and checks the status against `success_codes`.
    ///
    /// Each message is a single attempt; failed sends are reported, not
    /// retried, so a flaky endpoint cannot stall the scheduler.
    pub async fn post_json(
        &self,
        target: &str,
        url: &str,
        payload: &Value,
        success_codes: &[u16],
    ) -> DeliveryResult<()> {
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| DeliveryError::request(target, e.to_string()))?;

        let status = response.status().as_u16();
        if success_codes.contains(&status) {
            debug!(target, status, "Webhook message delivered");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            warn!(target, status, body = %body, "Webhook rejected message");
            Err(DeliveryError::status(target, status))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn unreachable_endpoint_is_a_request_error() {
        let sender = WebhookSender::new(Duration::from_millis(200)).unwrap();
        let err = sender
            .post_json("discord", "http://192.0.2.1:9/hook", &json!({}), &[200])
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::Request { .. }));
        assert_eq!(err.target(), Some("discord"));
    }
}
