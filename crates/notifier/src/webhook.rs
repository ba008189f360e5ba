//! Webhook delivery.

use async_trait::async_trait;

use crate::error::NotifyError;
use crate::payload::RenderedMessage;

/// Highest HTTP status treated as a successful delivery.
pub const MAX_SUCCESS_STATUS: u16 = 399;

/// Posts a payload to a webhook URL and reports the HTTP status it got back.
///
/// Implementations only fail for transport problems; interpreting the status
/// code is left to the caller.
#[async_trait]
pub trait WebhookDispatcher: Send + Sync {
    async fn post(&self, url: &str, payload: &RenderedMessage) -> Result<u16, NotifyError>;
}

/// [`WebhookDispatcher`] backed by `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct HttpWebhookDispatcher {
    client: reqwest::Client,
}

impl HttpWebhookDispatcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl WebhookDispatcher for HttpWebhookDispatcher {
    async fn post(&self, url: &str, payload: &RenderedMessage) -> Result<u16, NotifyError> {
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        tracing::info!(status, "Message posted to webhook");
        Ok(status)
    }
}

/// Map a webhook status code to a delivery result.
pub fn check_status(status: u16) -> Result<(), NotifyError> {
    if status > MAX_SUCCESS_STATUS {
        Err(NotifyError::DispatchFailed { status })
    } else {
        Ok(())
    }
}
